//! MP3 帧拼接
//!
//! MP3 流可以直接按帧首尾相接；除第一段外去掉 ID3v2 标签，避免中途出现元数据块。

const ID3V2_HEADER_LEN: usize = 10;
const ID3V1_LEN: usize = 128;

/// 去掉开头的 ID3v2 标签
pub fn strip_id3v2(data: &[u8]) -> &[u8] {
    if data.len() < ID3V2_HEADER_LEN || &data[0..3] != b"ID3" {
        return data;
    }
    // 同步安全整数，每字节 7 位
    let size = data[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | (*b & 0x7f) as usize);
    let footer = if data[5] & 0x10 != 0 { ID3V2_HEADER_LEN } else { 0 };
    let end = (ID3V2_HEADER_LEN + size + footer).min(data.len());
    &data[end..]
}

/// 去掉结尾的 ID3v1 标签
pub fn strip_id3v1(data: &[u8]) -> &[u8] {
    if data.len() >= ID3V1_LEN && &data[data.len() - ID3V1_LEN..data.len() - ID3V1_LEN + 3] == b"TAG"
    {
        return &data[..data.len() - ID3V1_LEN];
    }
    data
}

pub fn concat(parts: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(parts.iter().map(Vec::len).sum());
    for (i, part) in parts.iter().enumerate() {
        let body = if i == 0 {
            part.as_slice()
        } else {
            strip_id3v2(part)
        };
        out.extend_from_slice(strip_id3v1(body));
    }
    out
}
