use std::fmt::Write;

/// 按字符 (而非字节) 截断
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// 前 `n` 个字节的十六进制表示
pub fn hex_prefix(data: &[u8], n: usize) -> String {
    data.iter().take(n).fold(String::with_capacity(n * 2), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}

/// 执行语义化字符串截断 (带省略号)
pub fn ellipsize(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
