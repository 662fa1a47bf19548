//! User-visible strings
//!
//! Labels the editor writes into the document (upload placeholders) go
//! through a [`Translate`] implementation supplied by the host. Templates use
//! `{name}` parameters.

/// Looks up a label by key and fills in its parameters.
pub trait Translate {
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String;
}

impl<F> Translate for F
where
    F: Fn(&str, &[(&str, &str)]) -> String,
{
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
        self(key, params)
    }
}

/// Built-in English labels. Unknown keys come back as the key itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTranslator;

const DEFAULTS: &[(&str, &str)] = &[("uploading_filename", "Uploading: {filename}…")];

impl Translate for DefaultTranslator {
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
        let template = DEFAULTS
            .iter()
            .find(|(name, _)| *name == key)
            .map_or(key, |(_, template)| template);
        interpolate(template, params)
    }
}

/// Replace `{name}` placeholders. Unknown names are left as written.
pub fn interpolate(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match params.iter().find(|(key, _)| *key == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
