use serde::Serialize;

//JSON is good enough for a local dev chain
pub fn encode<M: Serialize>(message: M) -> anyhow::Result<Vec<u8>> {
    serde_json::to_vec(&message).map_err(|e| anyhow::anyhow!(e))
}

pub fn to_hex<T: AsRef<[u8]>>(data: T) -> String {
    array_bytes::bytes2hex("", data.as_ref())
}

pub fn from_hex<T: AsRef<str>>(data: T) -> anyhow::Result<Vec<u8>> {
    let data = data.as_ref();
    let data = data.strip_prefix("0x").unwrap_or(data);
    array_bytes::hex2bytes(data).map_err(|_| anyhow::anyhow!("Invalid hex string"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hex_accepts_prefixed_input() {
        let bytes = from_hex("0x0a0b").unwrap();
        assert_eq!(bytes, vec![10, 11]);
        assert_eq!(to_hex(bytes), "0a0b");
    }

    #[test]
    fn hex_rejects_garbage() {
        assert!(from_hex("zz").is_err());
    }
}
