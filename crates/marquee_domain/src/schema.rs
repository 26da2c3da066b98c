use serde::{Deserialize, Serialize};

const MOVIES_SCHEMA: &str = "\
- **_id** (Unique Identifier): A unique identifier for each movie.
- **plot** (Short Storyline): A brief summary of the movie's plot.
- **genres** (Array of Strings): List of genres associated with the movie.
- **runtime** (Number): Duration of the movie in minutes.
- **cast** (Array of Strings): List of actors in the movie.
- **poster** (String): URL for the movie's poster image.
- **title** (String): The title of the movie.
- **fullplot** (String): A detailed summary of the movie's storyline.
- **languages** (Array of Strings): List of languages the movie is available in.
- **released** (Date): Release date of the movie.
- **directors** (Array of Strings): List of directors who directed the movie.
- **rated** (String): Age rating of the movie (e.g., TV-G, PG-13).
- **awards** (Object): Contains details about awards the movie has received:
  - **wins** (Number): Number of awards won.
  - **nominations** (Number): Number of nominations.
  - **text** (String): Summary of awards in text form.
- **lastupdated** (String): The last time the movie's data was updated.
- **year** (Number): Year the movie was released.
- **imdb** (Object): Contains IMDb data:
  - **rating** (Number): IMDb rating of the movie.
  - **votes** (Number): Total number of votes received on IMDb.
  - **id** (Number): IMDb movie ID.
- **countries** (Array of Strings): List of countries where the movie was produced.
- **type** (String): Type of content (e.g., movie, series).
- **tomatoes** (Object): Contains Rotten Tomatoes data:
  - **viewer** (Object): Contains viewer-related data:
    - **rating** (Number): Viewer rating out of 5.
    - **numReviews** (Number): Total number of viewer reviews.
    - **meter** (Number): Viewer approval percentage.
  - **critic** (Object): Contains critic-related data:
    - **rating** (Number): Critic rating out of 10.
    - **numReviews** (Number): Total number of critic reviews.
    - **meter** (Number): Critic approval percentage.
  - **fresh** (Number): Number of \"Fresh\" ratings.
  - **rotten** (Number): Number of \"Rotten\" ratings.
  - **lastUpdated** (Date): Last time Rotten Tomatoes data was updated.
- **num_mflix_comments** (Number): Number of comments on the movie.";

/// Human-readable description of a collection, injected verbatim into prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub collection: String,
    pub text: String,
}

impl SchemaDescription {
    pub fn new(collection: impl Into<String>, text: impl Into<String>) -> Self {
        Self { collection: collection.into(), text: text.into() }
    }

    pub fn movies() -> Self {
        Self::new("movies", MOVIES_SCHEMA)
    }
}

/// A worked question to pipeline translation shown to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FewShotExample {
    pub input: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FewShotExamples(Vec<FewShotExample>);

impl FewShotExamples {
    pub fn new(examples: Vec<FewShotExample>) -> Self {
        Self(examples)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FewShotExample> {
        self.0.iter()
    }

    pub fn movies() -> Self {
        let pairs = [
            (
                "Get me movies with an IMDb rating above 8 and more than 10,000 votes.",
                r#"[ { "$match": { "imdb.rating": { "$gt": 8 }, "imdb.votes": { "$gt": 10000 } } } ]"#,
            ),
            (
                "Can you list movies that are in the 'Action' and 'Adventure' genres?",
                r#"[ { "$match": { "genres": { "$all": ["Action", "Adventure"] } } } ]"#,
            ),
            (
                "What is the average IMDb rating for 'Comedy' genre movies?",
                r#"[ { "$match": { "genres": "Comedy" } }, { "$group": { "_id": null, "averageRating": { "$avg": "$imdb.rating" } } } ]"#,
            ),
            (
                "Find me movies that feature 'A.C. Abadie' and belong to the 'Western' genre and also fetch poster and plot of the movies",
                r#"[ { "$match": { "cast": "A.C. Abadie", "genres": "Western" } }, { "$project": { "poster": 1, "plot": 1 } } ]"#,
            ),
            (
                "Can you get me the latest movies with a Rotten Tomatoes critic rating above 7 and a viewer rating above 4.",
                r#"[ { "$match": { "tomatoes.critic.rating": { "$gt": 7 }, "tomatoes.viewer.rating": { "$gt": 4 } } }, { "$sort": { "lastupdated": -1 } } ]"#,
            ),
            (
                "Show me movies from the 2000s that have won at least 3 awards.",
                r#"[ { "$match": { "year": { "$gte": 2000, "$lt": 2010 }, "awards.wins": { "$gte": 3 } } } ]"#,
            ),
        ];

        Self(
            pairs
                .into_iter()
                .map(|(input, output)| FewShotExample {
                    input: input.to_string(),
                    output: output.to_string(),
                })
                .collect(),
        )
    }
}
