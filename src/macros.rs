/// Lazily compiled `'static` regex. Patterns are compile-time constants, so a
/// failure here is a programming error caught by the first test that touches
/// the rule.
#[macro_export]
macro_rules! regex {
    ($pat:expr) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a date [`Rule`](crate::Rule).
///
/// ```ignore
/// rule! {
///     name: "2k<yy>",
///     source: DateSource::YearShorthand,
///     pattern: r"(?i)\b2k(\d{2})\b",
///     buckets: BucketMask::SHORTHAND,
///     prod: |caps| { Some(RawDate { month: None, year: 2000 + group_u32(caps, 1)? as i32 }) }
/// }
/// ```
macro_rules! rule {
    (
        name: $name:expr,
        source: $source:expr,
        pattern: $pat:expr
        $(, buckets: $buckets:expr)?
        , prod: |$caps:ident| $body:block
        $(,)?
    ) => {{
        $crate::Rule {
            name: $name,
            source: $source,
            pattern: $crate::regex!($pat),
            buckets: { $crate::engine::BucketMask::empty() $(| $buckets)? },
            production: |$caps: &regex::Captures<'_>| -> Option<$crate::RawDate> { $body },
        }
    }};
}
