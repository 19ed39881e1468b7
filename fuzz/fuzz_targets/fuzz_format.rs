#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
pub struct FormatInput {
    pub fmt: String,
    pub text: String,
    pub number: i64,
}

fuzz_target!(|input: FormatInput| {
    sql_expand::fuzz_helper::format_statement(&input.fmt, &input.text, input.number);
});
