//! Repository builder

use super::Repository;
use crate::config::RepositoryConfig;
use crate::schema::{DataLoader, Schema, StaticLoader};
use crate::sharding::ShardingRule;
use crate::write_back::{NoopWriteBack, WriteBack};
use std::sync::Arc;

/// Builder for [`Repository`]
///
/// Without a loader the repository starts empty and `init` loads nothing.
/// Without a write-back sink the no-op sink is used.
pub struct RepositoryBuilder<S: Schema> {
    schema: S,
    rule: Box<dyn ShardingRule<S::ShardKey>>,
    loader: Option<Box<dyn DataLoader<S::Value>>>,
    write_back: Option<Arc<dyn WriteBack>>,
    config: Option<RepositoryConfig>,
}

impl<S: Schema> RepositoryBuilder<S> {
    pub(crate) fn new(schema: S, rule: Box<dyn ShardingRule<S::ShardKey>>) -> Self {
        Self {
            schema,
            rule,
            loader: None,
            write_back: None,
            config: None,
        }
    }

    pub fn with_loader(mut self, loader: impl DataLoader<S::Value> + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Load `records` on `init`
    pub fn with_records(self, records: Vec<S::Value>) -> Self {
        self.with_loader(StaticLoader::new(records))
    }

    pub fn with_write_back(mut self, write_back: Arc<dyn WriteBack>) -> Self {
        self.write_back = Some(write_back);
        self
    }

    pub fn with_config(mut self, config: RepositoryConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Repository<S> {
        Repository::from_parts(
            self.schema,
            self.rule,
            self.loader
                .unwrap_or_else(|| Box::new(StaticLoader::<S::Value>::empty())),
            self.write_back
                .unwrap_or_else(|| Arc::new(NoopWriteBack)),
            self.config.unwrap_or_default(),
        )
    }
}
