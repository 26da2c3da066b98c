use marquee_domain::{Error, ToolCall, ToolDefinition};
use schemars::JsonSchema;
use serde::Deserialize;
use strum_macros::{AsRefStr, Display};

/// Reply used when a question has nothing to do with the movie collection.
pub const NO_CONTEXT_ANSWER: &str = "I cannot answer your question as I don't have the context";

/// Fetches movie documents matching a natural language question, e.g.
/// "Top 5 dramas by IMDb rating released after 2010". Returns the matching
/// documents as a JSON array.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct GetMovies {
    /// The question to look up, in plain English.
    pub query: String,
}

/// Use when the question cannot be answered from the movie collection.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, JsonSchema)]
pub struct NotAbleToParse {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ToolName {
    GetMovies,
    NotAbleToParse,
}

/// A parsed call to one of the answering agent's tools.
#[derive(Debug, Clone, PartialEq)]
pub enum MovieTool {
    GetMovies(GetMovies),
    NotAbleToParse(NotAbleToParse),
}

impl MovieTool {
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::new(ToolName::GetMovies)
                .description(
                    "Fetches movie documents matching a natural language question. Returns the \
                     matching documents as a JSON array.",
                )
                .input::<GetMovies>(),
            ToolDefinition::new(ToolName::NotAbleToParse)
                .description("Use when the question cannot be answered from the movie collection.")
                .input::<NotAbleToParse>(),
        ]
    }

    pub fn parse(call: &ToolCall) -> Result<Self, Error> {
        let arguments = match call.arguments.trim() {
            "" => "{}",
            arguments => arguments,
        };
        if call.name == ToolName::GetMovies.as_ref() {
            serde_json::from_str(arguments)
                .map(MovieTool::GetMovies)
                .map_err(Error::ToolCallArgument)
        } else if call.name == ToolName::NotAbleToParse.as_ref() {
            serde_json::from_str(arguments)
                .map(MovieTool::NotAbleToParse)
                .map_err(Error::ToolCallArgument)
        } else {
            Err(Error::UnknownTool(call.name.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_definitions() {
        let actual = MovieTool::definitions()
            .into_iter()
            .map(|tool| tool.name)
            .collect::<Vec<_>>();
        let expected = vec!["get_movies".to_string(), "not_able_to_parse".to_string()];
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_get_movies_schema_requires_query() {
        let fixture = MovieTool::definitions().remove(0);
        assert_eq!(fixture.input_schema["properties"]["query"]["type"], "string");
        assert_eq!(fixture.input_schema["required"], serde_json::json!(["query"]));
    }

    #[test]
    fn test_parse_get_movies() {
        let fixture = ToolCall::new("c1", "get_movies").arguments(r#"{"query": "best dramas"}"#);
        let actual = MovieTool::parse(&fixture).unwrap();
        let expected = MovieTool::GetMovies(GetMovies { query: "best dramas".to_string() });
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_parse_empty_arguments() {
        let fixture = ToolCall::new("c1", "not_able_to_parse").arguments("");
        let actual = MovieTool::parse(&fixture).unwrap();
        assert_eq!(actual, MovieTool::NotAbleToParse(NotAbleToParse {}));
    }

    #[test]
    fn test_parse_errors() {
        let fixture = ToolCall::new("c1", "get_movies").arguments(r#"{"q": 1}"#);
        assert!(matches!(MovieTool::parse(&fixture), Err(Error::ToolCallArgument(_))));

        let fixture = ToolCall::new("c2", "shell");
        assert!(matches!(MovieTool::parse(&fixture), Err(Error::UnknownTool(ref name)) if name == "shell"));
    }
}
