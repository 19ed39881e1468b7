#![no_main]
use libfuzzer_sys::fuzz_target;

use arbitrary::Arbitrary;

#[derive(Debug)]
pub struct TemplateInput {
    pub template: String,
}

impl<'a> Arbitrary<'a> for TemplateInput {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let template = random_template(u)?;
        Ok(TemplateInput { template })
    }
}

const MAX_TEMPLATE_LENGTH: usize = 10000;

fn random_template(u: &mut arbitrary::Unstructured) -> arbitrary::Result<String> {
    let s: String = u.arbitrary()?;
    Ok(s.chars().take(MAX_TEMPLATE_LENGTH).collect())
}

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = arbitrary::Unstructured::new(data).arbitrary::<TemplateInput>() {
        sql_expand::fuzz_helper::expand_template(&input.template);
    }
});
