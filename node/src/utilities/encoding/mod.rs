pub fn decode<M: for<'de> serde::Deserialize<'de>>(bytes: &[u8]) -> anyhow::Result<M> {
    serde_json::from_slice(bytes).map_err(|e| anyhow::anyhow!(e))
}

pub fn to_hex<T: AsRef<[u8]>>(data: T) -> String {
    array_bytes::bytes2hex("", data.as_ref())
}

pub fn from_hex<T: AsRef<[u8]>>(data: T) -> anyhow::Result<Vec<u8>> {
    array_bytes::hex2bytes(data.as_ref()).map_err(|_| anyhow::anyhow!("Invalid hex string"))
}
