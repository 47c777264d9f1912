// Numbers and lengths as they appear in attribute values.
//
// Lengths are converted to "pixel-equivalent" user units using the fixed
// factors of SVG 1.1 (90 user units per inch).

use crate::error::SvgPenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Px,
    Pt,
    Pc,
    Mm,
    Cm,
    In,
}

impl Unit {
    pub const ALL: [Unit; 6] = [Unit::Px, Unit::Pt, Unit::Pc, Unit::Mm, Unit::Cm, Unit::In];

    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Px => "px",
            Unit::Pt => "pt",
            Unit::Pc => "pc",
            Unit::Mm => "mm",
            Unit::Cm => "cm",
            Unit::In => "in",
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            Unit::Px => 1.0,
            Unit::Pt => 1.25,
            Unit::Pc => 15.0,
            Unit::Mm => 3.543307,
            Unit::Cm => 35.43307,
            Unit::In => 90.0,
        }
    }

    fn from_suffix(suffix: &str) -> Option<Unit> {
        Unit::ALL.into_iter().find(|u| u.suffix() == suffix)
    }
}

/// Length of the floating point literal at the start of `bytes`
/// (`[+-]? digits? (. digits)? ([eE] [+-]? digits)?`), or 0 if there is none.
pub(crate) fn number_prefix_len(bytes: &[u8]) -> usize {
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let mut has_digits = false;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        has_digits = true;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        let mut j = i + 1;
        let mut frac = false;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
            frac = true;
        }
        if frac || has_digits {
            i = j;
            has_digits |= frac;
        }
    }
    if !has_digits {
        return 0;
    }
    // Exponent only counts when digits follow; "2em" stays "2" + "em".
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}

/// Parses a number with an optional unit suffix. Empty input yields `default`.
/// An unknown suffix is logged and the number is used unit-less.
pub fn parse_scalar(text: &str, default: f64) -> f64 {
    let s = text.trim();
    if s.is_empty() {
        return default;
    }
    let len = number_prefix_len(s.as_bytes());
    let Some(value) = s[..len].parse::<f64>().ok() else {
        log::warn!("not a number: {s:?}, using {default}");
        return default;
    };
    let suffix = s[len..].trim();
    if suffix.is_empty() {
        return value;
    }
    match Unit::from_suffix(suffix) {
        Some(unit) => value * unit.factor(),
        None => {
            log::warn!("unknown unit {suffix:?} in {s:?}, treating value as unit-less");
            value
        }
    }
}

/// Splits a list of numbers separated by runs of whitespace and commas. A sign
/// also starts a new number, so `"10-5"` reads as `[10, -5]`.
pub fn parse_number_list(text: &str) -> Result<Vec<f64>, SvgPenError> {
    let mut out = Vec::new();
    let mut cursor = NumberCursor::new(text);
    while let Some(value) = cursor.next_number()? {
        out.push(value);
    }
    Ok(out)
}

/// Walks a run of separated numbers.
pub(crate) struct NumberCursor<'a> {
    bytes: &'a [u8],
    text: &'a str,
    i: usize,
}

impl<'a> NumberCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            text,
            i: 0,
        }
    }

    fn skip_separators(&mut self) {
        while self.i < self.bytes.len() && matches!(self.bytes[self.i], b' ' | b',' | b'\t' | b'\n' | b'\r') {
            self.i += 1;
        }
    }

    pub fn is_exhausted(&mut self) -> bool {
        self.skip_separators();
        self.i >= self.bytes.len()
    }

    /// `Ok(None)` at the end of input; an error when non-numeric text remains.
    pub fn next_number(&mut self) -> Result<Option<f64>, SvgPenError> {
        self.skip_separators();
        if self.i >= self.bytes.len() {
            return Ok(None);
        }
        let len = number_prefix_len(&self.bytes[self.i..]);
        if len == 0 {
            return Err(self.invalid());
        }
        let token = &self.text[self.i..self.i + len];
        let value = token.parse::<f64>().map_err(|_| self.invalid())?;
        self.i += len;
        Ok(Some(value))
    }

    /// Arc flags are single `0`/`1` characters and may be written without a
    /// separator (`a5 5 0 01 10 10`).
    pub fn next_flag(&mut self) -> Result<Option<bool>, SvgPenError> {
        self.skip_separators();
        match self.bytes.get(self.i) {
            None => Ok(None),
            Some(b'0') => {
                self.i += 1;
                Ok(Some(false))
            }
            Some(b'1') => {
                self.i += 1;
                Ok(Some(true))
            }
            Some(_) => Err(SvgPenError::attribute(
                "?",
                "d",
                format!("arc flag must be 0 or 1 near {:?}", self.rest()),
            )),
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.i..]
    }

    fn invalid(&self) -> SvgPenError {
        SvgPenError::attribute("?", "?", format!("expected a number at {:?}", self.rest()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_without_unit() {
        assert_eq!(parse_scalar("100", 0.0), 100.0);
        assert_eq!(parse_scalar("  -2.5 ", 0.0), -2.5);
        assert_eq!(parse_scalar("1e2", 0.0), 100.0);
        assert_eq!(parse_scalar(".5", 0.0), 0.5);
    }

    #[test]
    fn scalar_with_units() {
        assert!((parse_scalar("100cm", 0.0) - 3543.307).abs() < 1e-9);
        assert!((parse_scalar("10mm", 0.0) - 35.43307).abs() < 1e-9);
        assert_eq!(parse_scalar("2in", 0.0), 180.0);
        assert_eq!(parse_scalar("4pt", 0.0), 5.0);
        assert_eq!(parse_scalar("1pc", 0.0), 15.0);
        assert_eq!(parse_scalar("7px", 0.0), 7.0);
    }

    #[test]
    fn scalar_unknown_unit_is_unitless() {
        assert_eq!(parse_scalar("50%", 0.0), 50.0);
        assert_eq!(parse_scalar("2em", 0.0), 2.0);
    }

    #[test]
    fn scalar_empty_uses_default() {
        assert_eq!(parse_scalar("", 7.0), 7.0);
        assert_eq!(parse_scalar("   ", 3.0), 3.0);
        assert_eq!(parse_scalar("auto", 3.0), 3.0);
    }

    #[test]
    fn number_list_separators() {
        assert_eq!(
            parse_number_list("-1, 30 4  6.35,9").unwrap(),
            vec![-1.0, 30.0, 4.0, 6.35, 9.0]
        );
        assert_eq!(parse_number_list("10-5").unwrap(), vec![10.0, -5.0]);
        assert_eq!(parse_number_list("0.5.5").unwrap(), vec![0.5, 0.5]);
        assert_eq!(parse_number_list("1,2,").unwrap(), vec![1.0, 2.0]);
        assert!(parse_number_list("").unwrap().is_empty());
    }

    #[test]
    fn number_list_rejects_garbage() {
        assert!(parse_number_list("1 2 x 3").is_err());
    }

    #[test]
    fn flags_without_separator() {
        let mut cursor = NumberCursor::new("01 20");
        assert_eq!(cursor.next_flag().unwrap(), Some(false));
        assert_eq!(cursor.next_flag().unwrap(), Some(true));
        assert_eq!(cursor.next_number().unwrap(), Some(20.0));
        assert!(cursor.is_exhausted());
    }
}
