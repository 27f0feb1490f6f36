//! Output formatting utilities

use colored::Colorize;

/// Print a section header
pub(crate) fn section(title: &str) {
    println!("\n{}", format!("=== {title} ===").cyan().bold());
}

/// Print a key-value pair
pub(crate) fn kv(key: &str, value: impl std::fmt::Display) {
    println!("  {}: {}", key.white().bold(), value);
}

/// Print a success message
pub(crate) fn success(msg: &str) {
    println!("{} {}", "[PASS]".green().bold(), msg);
}

/// Print a warning message
pub(crate) fn warning(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// Print a failure message
pub(crate) fn fail(msg: &str) {
    println!("{} {}", "[FAIL]".red().bold(), msg);
}

/// Colored DPE label, green for A/B through red for F/G.
pub(crate) fn class_badge(class: dpe_predict::DpeClass) -> colored::ColoredString {
    use dpe_predict::DpeClass;
    let letter = format!(" {class} ");
    match class {
        DpeClass::A | DpeClass::B => letter.black().on_green(),
        DpeClass::C | DpeClass::D => letter.black().on_yellow(),
        DpeClass::E => letter.black().on_bright_red(),
        DpeClass::F | DpeClass::G => letter.white().on_red(),
    }
}

/// Thousands-separated kWh figure, one decimal.
pub(crate) fn format_kwh(kwh: f64) -> String {
    let rounded = format!("{kwh:.1}");
    let (int_part, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), "0"));
    let (sign, digits) = int_part
        .strip_prefix('-')
        .map_or(("", int_part), |d| ("-", d));

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}.{frac} kWh")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_kwh_groups_thousands() {
        assert_eq!(format_kwh(12345.67), "12 345.7 kWh");
        assert_eq!(format_kwh(50.0), "50.0 kWh");
        assert_eq!(format_kwh(1000.0), "1 000.0 kWh");
    }

    #[test]
    fn test_class_badge_contains_letter() {
        let badge = class_badge(dpe_predict::DpeClass::C);
        assert!(badge.to_string().contains('C'));
    }
}
