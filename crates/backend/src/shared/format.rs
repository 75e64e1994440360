/// Форматирует число с разделителями тысяч (точками): 1234567 -> "1.234.567"
pub fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push('.');
        }
        result.push(ch);
    }
    result
}

/// Начало тела ответа для логов: не более `max_chars` символов,
/// обрезанный текст заканчивается на "..."
pub fn body_preview(body: &str, max_chars: usize) -> String {
    let mut chars = body.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}
