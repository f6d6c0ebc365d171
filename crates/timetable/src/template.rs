//! Template resolution of output paths.
//!
//! Patterns embed `${path}` or `${path format}` placeholders. Only the
//! variables the scheduler needs for output locations are understood.

use chrono::format::{Item, StrftimeItems};

use ncanimate_common::{DateTimeRange, ProductConfig, RegionConfig, TimeIncrement, Timestamp};

/// Values a pattern may refer to.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorContext<'a> {
    pub config: &'a ProductConfig,
    pub date_range: DateTimeRange,
    pub frame_increment: Option<TimeIncrement>,
    pub region: Option<&'a RegionConfig>,
    pub target_height: Option<f64>,
}

impl<'a> GeneratorContext<'a> {
    pub fn new(config: &'a ProductConfig) -> Self {
        Self {
            config,
            date_range: DateTimeRange::AllTime,
            frame_increment: None,
            region: None,
            target_height: None,
        }
    }

    pub fn with_date_range(mut self, date_range: DateTimeRange) -> Self {
        self.date_range = date_range;
        self
    }

    pub fn with_frame_increment(mut self, increment: TimeIncrement) -> Self {
        self.frame_increment = Some(increment);
        self
    }

    pub fn with_region(mut self, region: Option<&'a RegionConfig>) -> Self {
        self.region = region;
        self
    }

    pub fn with_target_height(mut self, target_height: Option<f64>) -> Self {
        self.target_height = target_height;
        self
    }

    /// Value of a placeholder, `None` if unknown or unset.
    pub fn lookup(&self, path: &str, format: Option<&str>) -> Option<String> {
        match path {
            "id" | "ctx.productId" => Some(self.config.id.clone()),
            "render.definitionId" | "ctx.definitionId" => Some(self.config.definition_id().to_string()),
            "ctx.region.id" => self.region.map(|r| r.id.clone()),
            "ctx.region.label" => self.region.map(|r| r.label.clone().unwrap_or_else(|| r.id.clone())),
            "ctx.targetHeight" => Some(self.target_height.map_or_else(|| "0".to_string(), |h| h.to_string())),
            "ctx.dateFrom" => self.date_range.start().and_then(|t| format_date(&t, format)),
            "ctx.dateTo" => self.date_range.end().and_then(|t| format_date(&t, format)),
            "ctx.framePeriod" => self.frame_increment.map(|inc| inc.label().to_string()),
            "ctx.filenameDate" => {
                let increment = self.frame_increment?;
                let start = self.date_range.start()?;
                Some(increment.filename_date(&start))
            }
            _ => None,
        }
    }
}

fn format_date(t: &Timestamp, format: Option<&str>) -> Option<String> {
    match format {
        None => Some(t.to_rfc3339()),
        Some(format) => {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return None;
            }
            Some(t.format(format).to_string())
        }
    }
}

/// Turns patterns into concrete strings.
pub trait TemplateResolver: Send + Sync {
    /// Resolve every placeholder, or `None` if one is unresolvable.
    fn resolve(&self, pattern: &str, context: &GeneratorContext<'_>) -> Option<String>;

    /// Resolve what can be resolved, leaving other placeholders verbatim.
    fn resolve_lenient(&self, pattern: &str, context: &GeneratorContext<'_>) -> String;
}

/// Try each pattern strictly; fall back to the lenient form of the last one.
pub fn resolve_first(
    resolver: &dyn TemplateResolver,
    patterns: &[&str],
    context: &GeneratorContext<'_>,
) -> Option<String> {
    patterns
        .iter()
        .find_map(|pattern| resolver.resolve(pattern, context))
        .or_else(|| patterns.last().map(|pattern| resolver.resolve_lenient(pattern, context)))
}

/// Resolver for the `${...}` placeholders listed on [`GeneratorContext::lookup`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderResolver;

impl PlaceholderResolver {
    fn substitute(&self, pattern: &str, context: &GeneratorContext<'_>, lenient: bool) -> Option<String> {
        let mut out = String::with_capacity(pattern.len());
        let mut rest = pattern;

        while let Some(open) = rest.find("${") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let Some(close) = after.find('}') else {
                // Unterminated placeholder, kept as text.
                out.push_str(&rest[open..]);
                return Some(out);
            };

            let body = after[..close].trim();
            let (path, format) = match body.split_once(char::is_whitespace) {
                Some((path, format)) => (path, Some(format.trim())),
                None => (body, None),
            };

            match context.lookup(path, format) {
                Some(value) => out.push_str(&value),
                None if lenient => out.push_str(&rest[open..open + 2 + close + 1]),
                None => return None,
            }
            rest = &after[close + 1..];
        }

        out.push_str(rest);
        Some(out)
    }
}

impl TemplateResolver for PlaceholderResolver {
    fn resolve(&self, pattern: &str, context: &GeneratorContext<'_>) -> Option<String> {
        self.substitute(pattern, context, false)
    }

    fn resolve_lenient(&self, pattern: &str, context: &GeneratorContext<'_>) -> String {
        self.substitute(pattern, context, true)
            .unwrap_or_else(|| pattern.to_string())
    }
}
