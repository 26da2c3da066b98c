use marquee_app::Services;
#[cfg(not(feature = "mongodb"))]
use marquee_domain::Error;
use marquee_domain::{DocumentStore, Environment, Pipeline, StoreConfig};
#[cfg(feature = "mongodb")]
use marquee_infra::MongoStore;
use marquee_infra::{InMemoryHistory, MemoryStore, RhaiSandbox, SandboxLimits};
use marquee_provider::OpenAIProvider;
use serde_json::Value;

#[cfg(feature = "mongodb")]
const MOVIES_COLLECTION: &str = "movies";

/// The configured document store.
pub enum MovieStore {
    Memory(MemoryStore),
    #[cfg(feature = "mongodb")]
    Mongo(MongoStore),
}

impl MovieStore {
    pub async fn connect(config: &StoreConfig) -> anyhow::Result<Self> {
        match config {
            StoreConfig::Dataset(path) => Ok(MovieStore::Memory(MemoryStore::load(path).await?)),
            StoreConfig::Empty => {
                tracing::warn!("No dataset configured, queries will return no movies");
                Ok(MovieStore::Memory(MemoryStore::default()))
            }
            #[cfg(feature = "mongodb")]
            StoreConfig::Mongo { connection_string, database } => Ok(MovieStore::Mongo(
                MongoStore::connect(connection_string, database, MOVIES_COLLECTION).await?,
            )),
            #[cfg(not(feature = "mongodb"))]
            StoreConfig::Mongo { database, .. } => Err(Error::Config(format!(
                "MongoDB database '{database}' needs a build with the `mongodb` feature"
            ))
            .into()),
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for MovieStore {
    async fn aggregate(&self, pipeline: &Pipeline) -> anyhow::Result<Vec<Value>> {
        match self {
            MovieStore::Memory(store) => store.aggregate(pipeline).await,
            #[cfg(feature = "mongodb")]
            MovieStore::Mongo(store) => store.aggregate(pipeline).await,
        }
    }
}

/// Production wiring of the conversation's infrastructure.
pub struct MarqueeServices {
    completion: OpenAIProvider,
    store: MovieStore,
    history: InMemoryHistory,
    sandbox: RhaiSandbox,
}

impl MarqueeServices {
    pub async fn new(environment: &Environment) -> anyhow::Result<Self> {
        if environment.api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set, requests are sent without credentials");
        }
        let completion = OpenAIProvider::new(
            &environment.provider_url,
            environment.api_key.clone(),
            environment.retry_config.clone(),
        )?;
        let store = MovieStore::connect(&environment.store).await?;
        let sandbox = RhaiSandbox::new(SandboxLimits {
            max_operations: environment.sandbox_max_operations,
            timeout: std::time::Duration::from_millis(environment.sandbox_timeout_ms),
        });
        Ok(Self { completion, store, history: InMemoryHistory::new(), sandbox })
    }
}

impl Services for MarqueeServices {
    type Completion = OpenAIProvider;
    type Store = MovieStore;
    type History = InMemoryHistory;
    type Sandbox = RhaiSandbox;

    fn completion(&self) -> &Self::Completion {
        &self.completion
    }

    fn store(&self) -> &Self::Store {
        &self.store
    }

    fn history(&self) -> &Self::History {
        &self.history
    }

    fn sandbox(&self) -> &Self::Sandbox {
        &self.sandbox
    }
}
