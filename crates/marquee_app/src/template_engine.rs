use handlebars::{Handlebars, no_escape};
use lazy_static::lazy_static;
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "../../templates/"]
struct TemplateSource;

/// Creates a Handlebars instance in strict mode, without HTML escaping and
/// with every embedded prompt template registered.
fn create_handlebar() -> Handlebars<'static> {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(true);
    hb.register_escape_fn(no_escape);

    // 1-based numbering for few-shot examples
    hb.register_helper(
        "inc",
        Box::new(
            |h: &handlebars::Helper,
             _: &handlebars::Handlebars,
             _: &handlebars::Context,
             _: &mut handlebars::RenderContext,
             out: &mut dyn handlebars::Output|
             -> handlebars::HelperResult {
                let value = h.param(0).and_then(|v| v.value().as_u64()).ok_or_else(|| {
                    handlebars::RenderErrorReason::ParamNotFoundForIndex("inc", 0)
                })?;
                out.write(&(value + 1).to_string())?;
                Ok(())
            },
        ),
    );

    hb.register_helper(
        "json",
        Box::new(
            |h: &handlebars::Helper,
             _: &handlebars::Handlebars,
             _: &handlebars::Context,
             _: &mut handlebars::RenderContext,
             out: &mut dyn handlebars::Output|
             -> handlebars::HelperResult {
                let value = h.param(0).ok_or_else(|| {
                    handlebars::RenderErrorReason::ParamNotFoundForIndex("json", 0)
                })?;
                let json_string = serde_json::to_string(value.value())
                    .map_err(|e| handlebars::RenderErrorReason::NestedError(Box::new(e)))?;
                out.write(&json_string)?;
                Ok(())
            },
        ),
    );

    hb.register_embed_templates::<TemplateSource>().unwrap();
    hb
}

lazy_static! {
    static ref HANDLEBARS: Handlebars<'static> = create_handlebar();
}

/// Renders the embedded prompt templates.
#[derive(Clone)]
pub struct TemplateEngine<'a> {
    handlebar: Handlebars<'a>,
}

impl Default for TemplateEngine<'_> {
    fn default() -> Self {
        Self { handlebar: HANDLEBARS.clone() }
    }
}

impl TemplateEngine<'_> {
    /// Renders the template registered under `name`, e.g. `router-system.md`.
    pub fn render<V: serde::Serialize>(&self, name: &str, data: &V) -> anyhow::Result<String> {
        Ok(self.handlebar.render(name, data)?)
    }
}

#[cfg(test)]
mod tests {
    use marquee_domain::{FewShotExamples, SchemaDescription};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_router_template_lists_options() {
        let engine = TemplateEngine::default();
        let actual = engine
            .render(
                "router-system.md",
                &json!({"options": ["Movies", "Visualization", "Help", "NoContext"]}),
            )
            .unwrap();
        assert!(actual.contains("one of the words: Movies, Visualization, Help, or NoContext."));
    }

    #[test]
    fn test_translator_template_numbers_examples() {
        let engine = TemplateEngine::default();
        let schema = SchemaDescription::movies();
        let actual = engine
            .render(
                "translator-system.md",
                &json!({
                    "collection": schema.collection,
                    "schema": schema.text,
                    "examples": FewShotExamples::movies(),
                    "limit": 20,
                }),
            )
            .unwrap();
        assert!(actual.contains("Input1: Get me movies with an IMDb rating above 8"));
        assert!(actual.contains("Output6: "));
        assert!(actual.contains("to 20 using the `$limit` stage"));
        assert!(actual.contains("**imdb** (Object)"));
    }

    #[test]
    fn test_strict_mode_rejects_missing_variables() {
        let engine = TemplateEngine::default();
        let actual = engine.render("answer-system.md", &json!({}));
        assert!(actual.is_err());
    }
}
