use analytics::round_output;
use rust_decimal::Decimal;

/// Formats a dollar amount as `$1,234.56` or `-$12.00`.
pub fn money(value: Decimal) -> String {
    let rounded = round_output(value);
    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    let digits = format!("{:.2}", rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
    format!("{}${}.{}", sign, group_thousands(whole), cents)
}

/// Like `money`, with an explicit `+` on gains.
pub fn signed_money(value: Decimal) -> String {
    if round_output(value) > Decimal::ZERO {
        format!("+{}", money(value))
    } else {
        money(value)
    }
}

pub fn percent(value: Decimal) -> String {
    format!("{:.2}%", value)
}

/// A plain price, keeping up to four decimals for option premiums.
pub fn price(value: Decimal) -> String {
    value.normalize().to_string()
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Escapes text for inclusion in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn formats_money_with_grouping_and_sign() {
        assert_eq!(money(dec!(1234.5)), "$1,234.50");
        assert_eq!(money(dec!(-12)), "-$12.00");
        assert_eq!(money(dec!(0)), "$0.00");
        assert_eq!(money(dec!(1234567.891)), "$1,234,567.89");
        assert_eq!(money(dec!(999.995)), "$1,000.00");
        assert_eq!(money(dec!(-0.001)), "$0.00");
        assert_eq!(signed_money(dec!(5)), "+$5.00");
        assert_eq!(signed_money(dec!(-5)), "-$5.00");
    }

    #[test]
    fn formats_percent_and_price() {
        assert_eq!(percent(dec!(40)), "40.00%");
        assert_eq!(price(dec!(1.2500)), "1.25");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b>"fade" & 'fill'</b>"#),
            "&lt;b&gt;&quot;fade&quot; &amp; &#39;fill&#39;&lt;/b&gt;"
        );
    }
}
