//! Parsing of `#[channel(...)]` field attributes.

use syn::{Field, LitStr, Result};

/// Valid keys inside `#[channel(...)]`.
const KEYS: &[&str] = &["rename", "skip"];

#[derive(Debug, Default)]
pub struct ChannelAttrs {
    pub rename: Option<String>,
    pub skip: bool,
}

impl ChannelAttrs {
    pub fn from_field(field: &Field) -> Result<Self> {
        let mut attrs = ChannelAttrs::default();

        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("channel")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    if value.value().is_empty() {
                        return Err(meta.error("channel name cannot be empty"));
                    }
                    attrs.rename = Some(value.value());
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    attrs.skip = true;
                    Ok(())
                } else {
                    let key = meta
                        .path
                        .get_ident()
                        .map(ToString::to_string)
                        .unwrap_or_default();
                    Err(meta.error(format!(
                        "unknown channel attribute `{key}`; expected one of: {}",
                        KEYS.join(", ")
                    )))
                }
            })?;
        }

        if attrs.skip && attrs.rename.is_some() {
            return Err(syn::Error::new_spanned(
                field,
                "`skip` and `rename` cannot be combined",
            ));
        }

        Ok(attrs)
    }
}
