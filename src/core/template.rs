// cloud-imager/src/core/template.rs
use super::FileDescriptor;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("placeholder pattern is valid")
});

/// Variant name used for the untouched copy of the source.
pub const ORIGINAL_VARIANT: &str = "original";

/// Per (image, variant) metadata handed to formatters and outlets.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    pub image: &'a FileDescriptor,
    pub preset: String,
    pub variant: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl<'a> Context<'a> {
    pub fn new(image: &'a FileDescriptor, preset: &str, variant: &str) -> Self {
        Self {
            image,
            preset: preset.to_string(),
            variant: Some(variant.to_string()),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, extra: &BTreeMap<String, String>) -> Self {
        self.extra.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// `""` for a missing or original variant, `"_<variant>"` otherwise.
    pub fn prefixed_variant(&self) -> String {
        match self.variant() {
            Some(variant) if variant != ORIGINAL_VARIANT => format!("_{}", variant),
            _ => String::new(),
        }
    }

    /// Looks up a placeholder value; context fields shadow image fields.
    pub fn field(&self, key: &str) -> Option<Cow<'_, str>> {
        match key {
            "preset" => return Some(Cow::Borrowed(self.preset.as_str())),
            "variant" => return self.variant().map(Cow::Borrowed),
            _ => {}
        }
        if let Some(value) = self.extra.get(key) {
            return Some(Cow::Borrowed(value.as_str()));
        }
        let image_field = match key {
            "name" => self.image.name(),
            "extension" => self.image.extension(),
            "basename" => self.image.basename(),
            "mimeExtension" => self.image.mime_extension(),
            "uid" => self.image.uid(),
            "prefixedVariant" => return Some(Cow::Owned(self.prefixed_variant())),
            _ => return None,
        };
        Some(Cow::Borrowed(image_field))
    }
}

type ComputedFormat = dyn Fn(&Context<'_>) -> String + Send + Sync;

/// A file name template, either literal or computed from the context.
#[derive(Clone)]
pub enum FileNameFormat {
    Template(String),
    Computed(Arc<ComputedFormat>),
}

impl FileNameFormat {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Context<'_>) -> String + Send + Sync + 'static,
    {
        FileNameFormat::Computed(Arc::new(f))
    }

    /// Resolves a computed format into a template string.
    pub fn template_for(&self, context: &Context<'_>) -> String {
        match self {
            FileNameFormat::Template(template) => template.clone(),
            FileNameFormat::Computed(f) => f(context),
        }
    }
}

impl fmt::Debug for FileNameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileNameFormat::Template(template) => f.debug_tuple("Template").field(template).finish(),
            FileNameFormat::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for FileNameFormat {
    fn from(template: &str) -> Self {
        FileNameFormat::Template(template.to_string())
    }
}

impl From<String> for FileNameFormat {
    fn from(template: String) -> Self {
        FileNameFormat::Template(template)
    }
}

/// Turns a file name format and a context into a destination name.
pub trait FileNameFormatter: Send + Sync {
    fn format(&self, format: &FileNameFormat, context: &Context<'_>) -> String;
}

impl<F> FileNameFormatter for F
where
    F: Fn(&FileNameFormat, &Context<'_>) -> String + Send + Sync,
{
    fn format(&self, format: &FileNameFormat, context: &Context<'_>) -> String {
        self(format, context)
    }
}

/// Substitutes `{{field}}` placeholders, leaving unknown ones verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFileNameFormatter;

impl FileNameFormatter for DefaultFileNameFormatter {
    fn format(&self, format: &FileNameFormat, context: &Context<'_>) -> String {
        let template = format.template_for(context);
        PLACEHOLDER
            .replace_all(&template, |caps: &Captures<'_>| match context.field(&caps[1]) {
                Some(value) => value.into_owned(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExtensionMimeLookup, UploadRecord};

    fn descriptor() -> FileDescriptor {
        let record = UploadRecord {
            path: "/tmp/upload".into(),
            name: "cat.jpeg".into(),
            content_type: Some("image/jpeg".into()),
        };
        FileDescriptor::new(record.into(), &ExtensionMimeLookup).unwrap()
    }

    fn render(template: &str, context: &Context<'_>) -> String {
        DefaultFileNameFormatter.format(&FileNameFormat::from(template), context)
    }

    #[test]
    fn substitutes_every_supported_placeholder() {
        let image = descriptor();
        let context = Context::new(&image, "avatars", "thumb");
        let rendered = render(
            "{{name}}|{{extension}}|{{basename}}|{{mimeExtension}}|{{uid}}|{{preset}}|{{variant}}|{{prefixedVariant}}",
            &context,
        );
        let expected = format!("cat.jpeg|.jpeg|cat|.jpg|{}|avatars|thumb|_thumb", image.uid());
        assert_eq!(rendered, expected);
    }

    #[test]
    fn unknown_placeholders_are_left_verbatim() {
        let image = descriptor();
        let context = Context::new(&image, "default", "square");
        assert_eq!(
            render("{{basename}}-{{width}}{{ nope }}", &context),
            "cat-{{width}}{{ nope }}"
        );
    }

    #[test]
    fn prefixed_variant_is_empty_for_original_or_missing() {
        let image = descriptor();
        let mut context = Context::new(&image, "default", ORIGINAL_VARIANT);
        assert_eq!(context.prefixed_variant(), "");
        context.variant = None;
        assert_eq!(context.prefixed_variant(), "");
        assert_eq!(render("{{variant}}", &context), "{{variant}}");

        for variant in ["a", "Original", "originals", "square_100"] {
            let context = Context::new(&image, "default", variant);
            assert_eq!(context.prefixed_variant(), format!("_{}", variant));
        }
    }

    #[test]
    fn extra_fields_are_available() {
        let image = descriptor();
        let mut extra = BTreeMap::new();
        extra.insert("tenant".to_string(), "acme".to_string());
        extra.insert("basename".to_string(), "shadowed".to_string());
        let context = Context::new(&image, "default", "square").with_extra(&extra);
        assert_eq!(render("{{tenant}}/{{basename}}", &context), "acme/shadowed");
    }

    #[test]
    fn computed_format_is_resolved_before_substitution() {
        let image = descriptor();
        let context = Context::new(&image, "gallery", "large");
        let format = FileNameFormat::computed(|ctx| format!("{}/{{{{basename}}}}.out", ctx.preset));
        assert_eq!(
            DefaultFileNameFormatter.format(&format, &context),
            "gallery/cat.out"
        );
    }

    #[test]
    fn closures_can_replace_the_formatter() {
        let image = descriptor();
        let context = Context::new(&image, "default", "square");
        let formatter = |_: &FileNameFormat, ctx: &Context<'_>| ctx.preset.to_uppercase();
        assert_eq!(formatter.format(&"ignored".into(), &context), "DEFAULT");
    }
}
