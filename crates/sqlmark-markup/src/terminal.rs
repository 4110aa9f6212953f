//! Default, ungated terminal renderer used when a statement runs with
//! `render = true`: writes a colorized rendering of a `Section` to stdout.

use std::env;

use owo_colors::OwoColorize;

use sqlmark_core::Section;

const HEADING: (u8, u8, u8) = (0x59, 0xc2, 0xff);
const LABEL: (u8, u8, u8) = (0xff, 0xb4, 0x54);
const CODE: (u8, u8, u8) = (0x6c, 0x76, 0x80);

/// Whether truecolor output should be emitted: respects `NO_COLOR` and
/// `TERM=dumb`, then falls back to TTY detection.
pub fn supports_color() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if env::var("TERM").as_deref() == Ok("dumb") {
        return false;
    }
    crossterm::tty::IsTty::is_tty(&std::io::stdout())
}

fn color_str(s: &str, rgb: (u8, u8, u8)) -> String {
    if supports_color() {
        s.truecolor(rgb.0, rgb.1, rgb.2).to_string()
    } else {
        s.to_string()
    }
}

fn color_bold_str(s: &str, rgb: (u8, u8, u8)) -> String {
    if supports_color() {
        s.truecolor(rgb.0, rgb.1, rgb.2).bold().to_string()
    } else {
        s.to_string()
    }
}

/// An optional external collaborator, invoked only when a statement runs
/// with `render = true`, that writes a colorized view of a `Section` to
/// stdout.
pub struct TerminalRenderer;

impl TerminalRenderer {
    pub fn render_section(section: &Section) {
        println!("{}", color_bold_str(&section.heading_text, HEADING));
        for item in &section.items {
            if item.key == "sql" {
                println!("{}", color_str(&item.value, CODE));
                continue;
            }
            match &item.label {
                Some(label) => println!("  {}: {}", color_str(label, LABEL), item.value),
                None => println!("  {}", item.value),
            }
        }
    }

    /// Writes an already-rendered markdown string directly.
    pub fn render_markdown(markdown: &str) {
        print!("{markdown}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use sqlmark_config::Configuration;
    use sqlmark_core::AttrValue;

    #[test]
    fn render_section_does_not_panic_on_empty_items() {
        let cfg = Configuration::default();
        let section = Section::build(2, "heading", &[], &HashMap::new(), &cfg, &[]);
        TerminalRenderer::render_section(&section);
    }

    #[test]
    fn render_section_handles_sql_and_labeled_items() {
        let cfg = Configuration::default();
        let attrs = vec![
            ("sql".to_string(), AttrValue::Str("select 1".to_string())),
            ("description".to_string(), AttrValue::Str("d".to_string())),
        ];
        let section = Section::build(2, "heading", &attrs, &HashMap::new(), &cfg, &[]);
        TerminalRenderer::render_section(&section);
    }

    #[test]
    fn render_section_coerces_to_the_statement_render_sink_signature() {
        use sqlmark_query::{QueryError, QueryExecutor, Tabular, Value};
        use sqlmark_script::{RunOptions, Script};

        struct StubExecutor;
        impl QueryExecutor for StubExecutor {
            fn query(&self, _sql: &str, _results: bool, _lower: bool) -> std::result::Result<Tabular, QueryError> {
                Ok(Tabular::new(vec!["x".to_string()], vec![vec![Value::Integer(1)]]))
            }
            fn ex(&self, _sql: &str) -> std::result::Result<(), QueryError> {
                Ok(())
            }
        }

        let cfg = Configuration::default();
        let mut script = Script::parse("select 1;", cfg).unwrap();
        let opts = RunOptions {
            render: true,
            render_sink: Some(TerminalRenderer::render_section as fn(&Section)),
            ..RunOptions::all_continue()
        };
        script.run_all(&StubExecutor, &opts).unwrap();
    }
}
