//! TeX math to MathML through KaTeX.
//!
//! KaTeX runs in an embedded JavaScript engine owned by the `katex` crate,
//! one per thread, so the rayon page workers never share it. Parse errors
//! are returned rather than drawn in red, so a typo never reaches the page.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathDisplay {
    Inline,
    Block,
}

impl MathDisplay {
    fn is_block(self) -> bool {
        matches!(self, MathDisplay::Block)
    }
}

/// Renders a TeX fragment to a `<math>` element with the source kept as an
/// `application/x-tex` annotation.
pub fn render_mathml(tex: &str, display: MathDisplay) -> std::result::Result<String, String> {
    let opts = katex::Opts::builder()
        .display_mode(display.is_block())
        .output_type(katex::OutputType::Mathml)
        .throw_on_error(true)
        .trust(false)
        .build()
        .map_err(|e| e.to_string())?;

    katex::render_with_opts(tex.trim(), &opts).map_err(|e| match e {
        katex::Error::JsExecError(detail) => detail,
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(tex: &str) -> String {
        render_mathml(tex, MathDisplay::Inline).unwrap()
    }

    #[test]
    fn test_inline_keeps_source_annotation() {
        let output = render("x + 12 = y");
        assert!(output.contains("<math"));
        assert!(output.contains("<mi>x</mi>"));
        assert!(output.contains("<mn>12</mn>"));
        assert!(!output.contains("display=\"block\""));
        assert!(output.contains("<annotation encoding=\"application/x-tex\">x + 12 = y</annotation>"));
    }

    #[test]
    fn test_block_display() {
        let output = render_mathml("E = mc^2", MathDisplay::Block).unwrap();
        assert!(output.contains("display=\"block\""));
    }

    #[test]
    fn test_environments() {
        let cases = render_mathml(
            "\\begin{cases} 1 & x > 0 \\\\ 0 & x \\le 0 \\end{cases}",
            MathDisplay::Block,
        )
        .unwrap();
        assert!(cases.contains("<mtable"));
        assert!(cases.contains("<mo>≤</mo>"));

        let matrix = render("\\begin{bmatrix} a & b \\\\ c & d \\end{bmatrix}");
        assert!(matrix.contains("<mtable"));

        let aligned = render_mathml(
            "\\begin{aligned} a &= b \\\\ c &= d \\end{aligned}",
            MathDisplay::Block,
        )
        .unwrap();
        assert!(aligned.contains("<mtable"));
    }

    #[test]
    fn test_norms_and_braces() {
        assert!(render("\\lVert w \\rVert_2").contains("∥"));
        assert!(render("\\underbrace{a+b}_{n}").contains("<munder>"));
        assert!(render("\\frac{a}{b}").contains("<mfrac>"));
        assert!(render("\\sum_{i=1}^{n} \\alpha_i").contains("<mi>α</mi>"));
    }

    #[test]
    fn test_annotation_is_escaped() {
        let output = render("a < b");
        assert!(output.contains("<mo>&lt;</mo>"));
        assert!(output.contains(">a &lt; b</annotation>"));
    }

    #[test]
    fn test_errors() {
        let error = render_mathml("\\nosuchcommand", MathDisplay::Inline).unwrap_err();
        assert!(error.contains("nosuchcommand"));
        assert!(render_mathml("\\frac{a}{b", MathDisplay::Inline).is_err());
        assert!(render_mathml("x^2^3", MathDisplay::Inline).is_err());
        assert!(render_mathml("\\left( x", MathDisplay::Inline).is_err());
    }
}
