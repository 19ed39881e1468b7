use crate::{
    format::{Arg, format},
    resolve::MapSource,
    template::Expander,
};

// A small fixed environment so references resolve to something
fn source() -> MapSource {
    MapSource::new()
        .var("NAME", "O'Brien")
        .var("N", "42")
        .var("EXPR", "(1+2)*-3.5e2")
        .var("LIST", "a,b\tc,'d'")
        .var("TICK", "col`name")
        .var("NL", "line\nbreak\\")
        .var("F", "/dev/null")
        .stdin("from stdin\n")
}

/// Expands [template], ignoring errors.
pub fn expand_template(template: &str) {
    let _ = Expander::new(source()).expand(template);
}

/// Formats [fmt] against a fixed spread of arguments, ignoring errors.
pub fn format_statement(fmt: &str, text: &str, number: i64) {
    let mut args = [
        Arg::from(text),
        Arg::Int(number),
        Arg::Float(number as f64 / 7.0),
        Arg::Timestamp(number),
        Arg::null(),
        Arg::Bool(number % 2 == 0),
        Arg::from(text),
        Arg::UInt(number as u64),
    ];
    let _ = format(fmt, &mut args);
}
