pub(crate) mod api_cmd;
pub(crate) mod builder;
pub(crate) mod node;
pub(crate) mod shutdown;
