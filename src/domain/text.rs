//! 文本工具
//!
//! 字符偏移换算、分词、分句、音节计数等共享的底层文本操作。
//! 所有对外暴露的位置都是字符偏移（Unicode scalar），内部匹配使用字节偏移。

use regex::Regex;
use std::sync::LazyLock;

static WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{L}\p{N}]+(?:['’]\p{L}+)*").expect("Invalid word pattern regex")
});

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n\s*").expect("Invalid paragraph pattern regex"));

/// 字节偏移 -> 字符偏移 索引
#[derive(Debug, Clone)]
pub struct CharIndex {
    /// 每个字符的起始字节偏移
    byte_starts: Vec<usize>,
    len_bytes: usize,
}

impl CharIndex {
    pub fn new(text: &str) -> Self {
        Self {
            byte_starts: text.char_indices().map(|(b, _)| b).collect(),
            len_bytes: text.len(),
        }
    }

    /// 字符总数
    pub fn char_len(&self) -> usize {
        self.byte_starts.len()
    }

    /// 将字节偏移转换为字符偏移
    ///
    /// 落在多字节字符中间的偏移会向后取整到下一个字符
    pub fn to_char(&self, byte: usize) -> usize {
        if byte >= self.len_bytes {
            return self.byte_starts.len();
        }
        match self.byte_starts.binary_search(&byte) {
            Ok(i) => i,
            Err(i) => i,
        }
    }

    /// 将字符偏移转换为字节偏移
    pub fn to_byte(&self, ch: usize) -> usize {
        self.byte_starts.get(ch).copied().unwrap_or(self.len_bytes)
    }
}

/// 文本中的一个单词（字节偏移）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// 字节区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.start && pos < self.end
    }
}

/// 分词
pub fn words(text: &str) -> Vec<Word<'_>> {
    WORD_PATTERN
        .find_iter(text)
        .map(|m| Word {
            text: m.as_str(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// 文本开头的单词，文本不以字母数字开头时返回 None
pub fn leading_word(text: &str) -> Option<Word<'_>> {
    if !text.starts_with(|c: char| c.is_alphanumeric()) {
        return None;
    }
    WORD_PATTERN
        .find(text)
        .filter(|m| m.start() == 0)
        .map(|m| Word {
            text: m.as_str(),
            start: m.start(),
            end: m.end(),
        })
}

/// 单词数
pub fn word_count(text: &str) -> usize {
    WORD_PATTERN.find_iter(text).count()
}

/// 小写单词列表（统一弯引号）
pub fn lowercase_words(text: &str) -> Vec<String> {
    WORD_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase().replace('’', "'"))
        .collect()
}

#[inline]
fn is_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?' | '…')
}

#[inline]
fn is_closing(ch: char) -> bool {
    matches!(ch, '"' | '\'' | '”' | '’' | ')' | ']')
}

/// 分句
///
/// 句子在终止标点（及紧随的右引号/括号）后遇到空白或文本结束时结束。
/// 返回的区间已去除首尾空白，空句被丢弃。
pub fn sentences(text: &str) -> Vec<Span> {
    let mut result = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        if !is_terminal(ch) {
            continue;
        }
        let mut end = i + ch.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if is_terminal(next) || is_closing(next) {
                end = j + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let at_boundary = match chars.peek() {
            None => true,
            Some(&(_, next)) => next.is_whitespace(),
        };
        if at_boundary {
            push_trimmed(text, start, end, &mut result);
            start = end;
        }
    }
    push_trimmed(text, start, text.len(), &mut result);
    result
}

fn push_trimmed(text: &str, start: usize, end: usize, out: &mut Vec<Span>) {
    if let Some(span) = trim_span(text, start, end) {
        out.push(span);
    }
}

/// 去除区间首尾空白，全空白时返回 None
pub fn trim_span(text: &str, start: usize, end: usize) -> Option<Span> {
    let slice = &text[start..end];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    if lead == slice.len() {
        return None;
    }
    Some(Span::new(start + lead, end - trail))
}

/// 按空行分段
pub fn paragraphs(text: &str) -> Vec<Span> {
    let mut result = Vec::new();
    let mut start = 0;
    for m in PARAGRAPH_BREAK.find_iter(text) {
        push_trimmed(text, start, m.start(), &mut result);
        start = m.end();
    }
    push_trimmed(text, start, text.len(), &mut result);
    result
}

/// 元音簇音节计数
///
/// 连续元音（含 y）算一个音节，词尾不发音的 e 扣除（-le 除外），最少 1 个
pub fn count_syllables(word: &str) -> usize {
    let lower: Vec<char> = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if lower.is_empty() {
        return 0;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut count = 0;
    let mut prev_vowel = false;
    for &c in &lower {
        let v = is_vowel(c);
        if v && !prev_vowel {
            count += 1;
        }
        prev_vowel = v;
    }

    let n = lower.len();
    if n > 2 && lower[n - 1] == 'e' && lower[n - 2] != 'l' && !is_vowel(lower[n - 2]) && count > 1
    {
        count -= 1;
    }

    count.max(1)
}

/// 是否首字母大写且其余为小写字母（人名形态）
pub fn is_name_like(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => {
            let rest: Vec<char> = chars.collect();
            !rest.is_empty() && rest.iter().all(|c| c.is_lowercase() || *c == '\'' || *c == '’')
        }
        _ => false,
    }
}

/// 短语是否以单词边界出现在小写文本中
pub fn contains_phrase(haystack_lower: &str, phrase: &str) -> bool {
    find_phrase(haystack_lower, phrase, 0).is_some()
}

/// 短语以单词边界出现的次数
pub fn count_phrase(haystack_lower: &str, phrase: &str) -> usize {
    let mut count = 0;
    let mut from = 0;
    while let Some(end) = find_phrase(haystack_lower, phrase, from) {
        count += 1;
        from = end;
    }
    count
}

/// 从 `from` 开始查找，返回匹配结束的字节偏移
fn find_phrase(haystack: &str, phrase: &str, mut from: usize) -> Option<usize> {
    if phrase.is_empty() {
        return None;
    }
    while from < haystack.len() {
        let start = from + haystack[from..].find(phrase)?;
        let end = start + phrase.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return Some(end);
        }
        from = start + 1;
        while from < haystack.len() && !haystack.is_char_boundary(from) {
            from += 1;
        }
    }
    None
}

/// 四舍五入到两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
