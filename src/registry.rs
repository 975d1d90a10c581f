//! Type registry.
//!
//! Maps a `(category, type name)` pair from the configuration to a
//! constructor. Built-in types are matched first; any other name is looked up
//! as `plugin_<Name>.yaml` in the plugin directory, which must define the
//! symbol `<Prefix><Name>` for the category. Every resolution is cached for
//! the life of the registry.

mod plugin;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::collector::{
    BandwidthCollector, Collector, CollectorDefinition, CollectorError, CommandCollector,
    LoadCollector, MemoryCollector, PacketsCollector, PluginCollector, ReadFileCollector,
    SqlQueryCollector,
};
use crate::config::Params;
use crate::database::{
    BackendConnection, ConnectionParams, DatabaseError, DatabaseSet, SqlBackend, SqlDialect,
};
use crate::publisher::{
    Json, NiceTable, OutputTarget, PublishError, Publisher, PublisherDefinition, SqlTablePublisher,
    TemplateRender, TextPublisher,
};

pub use plugin::{DatabaseDefinition, plugin_path};

/// Builds a collector from an input's agent parameters.
pub type CollectorFactory = Arc<
    dyn Fn(&Params, &DatabaseSet) -> Result<Box<dyn Collector>, CollectorError> + Send + Sync,
>;

/// Builds a publisher from an output's parameters.
pub type PublisherFactory = Arc<
    dyn Fn(&Params, &DatabaseSet) -> Result<Box<dyn Publisher>, PublishError> + Send + Sync,
>;

/// Builds a backend from connection parameters.
pub type DatabaseFactory = Arc<
    dyn Fn(ConnectionParams) -> Result<Arc<dyn BackendConnection>, DatabaseError> + Send + Sync,
>;

/// Kind of type a configuration entry names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString)]
pub enum Category {
    /// Metric sources (`inputs[].agent.agentname`).
    #[strum(serialize = "coll")]
    Collector,
    /// Sinks (`outputs[].type`).
    #[strum(serialize = "pub")]
    Publisher,
    /// Backends (`databases[].type`).
    #[strum(serialize = "database")]
    Database,
}

impl Category {
    /// Prefix of the symbol a plugin file must define for this category.
    pub fn symbol_prefix(self) -> &'static str {
        match self {
            Self::Collector => "Collector_",
            Self::Publisher => "Publisher_",
            Self::Database => "DatabaseConnection_",
        }
    }
}

/// A resolved constructor of any category.
#[derive(Clone)]
pub enum Constructor {
    Collector(CollectorFactory),
    Publisher(PublisherFactory),
    Database(DatabaseFactory),
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let category = match self {
            Self::Collector(_) => Category::Collector,
            Self::Publisher(_) => Category::Publisher,
            Self::Database(_) => Category::Database,
        };
        f.debug_tuple("Constructor").field(&category).finish()
    }
}

/// Errors raised while resolving a type name.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Neither a built-in nor a plugin file provides the type.
    #[error("unknown {category} type '{name}' (no plugin at {})", path.display())]
    UnknownType {
        category: Category,
        name: String,
        path: PathBuf,
    },

    /// The plugin file exists but does not provide a usable definition.
    #[error("cannot load {symbol} from {}: {reason}", path.display())]
    PluginLoad {
        path: PathBuf,
        symbol: String,
        reason: String,
    },
}

/// Resolves configured type names to constructors.
pub struct TypeRegistry {
    plugin_dir: PathBuf,
    collectors: HashMap<String, CollectorFactory>,
    publishers: HashMap<String, PublisherFactory>,
    databases: HashMap<String, DatabaseFactory>,
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("plugin_dir", &self.plugin_dir)
            .field("collectors", &self.collectors.keys().collect::<Vec<_>>())
            .field("publishers", &self.publishers.keys().collect::<Vec<_>>())
            .field("databases", &self.databases.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new(".")
    }
}

impl TypeRegistry {
    /// Create a registry looking for plugin files in `plugin_dir`.
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            collectors: HashMap::new(),
            publishers: HashMap::new(),
            databases: HashMap::new(),
        }
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// Resolve a type name of any category.
    pub fn resolve(&mut self, category: Category, name: &str) -> Result<Constructor, RegistryError> {
        Ok(match category {
            Category::Collector => Constructor::Collector(self.resolve_collector(name)?),
            Category::Publisher => Constructor::Publisher(self.resolve_publisher(name)?),
            Category::Database => Constructor::Database(self.resolve_database(name)?),
        })
    }

    /// Resolve a source type name.
    pub fn resolve_collector(&mut self, name: &str) -> Result<CollectorFactory, RegistryError> {
        if let Some(factory) = self.collectors.get(name) {
            return Ok(factory.clone());
        }

        let factory = match builtin_collector(name) {
            Some(factory) => factory,
            None => {
                let path = self.plugin_file(Category::Collector, name)?;
                let symbol = format!("{}{}", Category::Collector.symbol_prefix(), name);
                let definition: CollectorDefinition = plugin::load_symbol(&path, &symbol)?;
                tracing::info!(category = %Category::Collector, type_name = name, path = %path.display(), "Loaded plugin type");

                let kind = name.to_string();
                let factory: CollectorFactory = Arc::new(
                    move |params: &Params,
                          _: &DatabaseSet|
                          -> Result<Box<dyn Collector>, CollectorError> {
                        Ok(Box::new(PluginCollector::new(&kind, &definition, params)?))
                    },
                );
                factory
            }
        };

        self.collectors.insert(name.to_string(), factory.clone());
        Ok(factory)
    }

    /// Resolve a sink type name.
    pub fn resolve_publisher(&mut self, name: &str) -> Result<PublisherFactory, RegistryError> {
        if let Some(factory) = self.publishers.get(name) {
            return Ok(factory.clone());
        }

        let factory = match builtin_publisher(name) {
            Some(factory) => factory,
            None => {
                let path = self.plugin_file(Category::Publisher, name)?;
                let symbol = format!("{}{}", Category::Publisher.symbol_prefix(), name);
                let definition: PublisherDefinition = plugin::load_symbol(&path, &symbol)?;
                tracing::info!(category = %Category::Publisher, type_name = name, path = %path.display(), "Loaded plugin type");

                let kind = name.to_string();
                let factory: PublisherFactory = Arc::new(
                    move |params: &Params,
                          _: &DatabaseSet|
                          -> Result<Box<dyn Publisher>, PublishError> {
                        let target = OutputTarget::from_params(&kind, params)?;
                        let renderer = Box::new(TemplateRender::new(&definition));
                        Ok(Box::new(TextPublisher::new(kind.as_str(), renderer, target)))
                    },
                );
                factory
            }
        };

        self.publishers.insert(name.to_string(), factory.clone());
        Ok(factory)
    }

    /// Resolve a backend type name.
    pub fn resolve_database(&mut self, name: &str) -> Result<DatabaseFactory, RegistryError> {
        if let Some(factory) = self.databases.get(name) {
            return Ok(factory.clone());
        }

        let factory = match builtin_dialect(name) {
            Some(dialect) => sql_backend_factory(dialect),
            None => {
                let path = self.plugin_file(Category::Database, name)?;
                let symbol = format!("{}{}", Category::Database.symbol_prefix(), name);
                let definition: DatabaseDefinition = plugin::load_symbol(&path, &symbol)?;
                let DatabaseDefinition::Alias { dialect } = definition;
                tracing::info!(category = %Category::Database, type_name = name, %dialect, path = %path.display(), "Loaded plugin type");
                sql_backend_factory(dialect)
            }
        };

        self.databases.insert(name.to_string(), factory.clone());
        Ok(factory)
    }

    /// Locate the plugin file for `name`, or report the type as unknown.
    fn plugin_file(&self, category: Category, name: &str) -> Result<PathBuf, RegistryError> {
        let path = plugin_path(&self.plugin_dir, name);
        if !plugin::is_plugin_name(name) || !path.is_file() {
            return Err(RegistryError::UnknownType {
                category,
                name: name.to_string(),
                path,
            });
        }
        Ok(path)
    }
}

fn builtin_collector(name: &str) -> Option<CollectorFactory> {
    let factory: CollectorFactory = match name {
        ReadFileCollector::KIND => Arc::new(ReadFileCollector::from_params),
        BandwidthCollector::KIND => Arc::new(BandwidthCollector::from_params),
        PacketsCollector::KIND => Arc::new(PacketsCollector::from_params),
        LoadCollector::KIND => Arc::new(LoadCollector::from_params),
        MemoryCollector::KIND => Arc::new(MemoryCollector::from_params),
        CommandCollector::KIND => Arc::new(CommandCollector::from_params),
        SqlQueryCollector::KIND => Arc::new(SqlQueryCollector::from_params),
        _ => return None,
    };
    Some(factory)
}

fn builtin_publisher(name: &str) -> Option<PublisherFactory> {
    let factory: PublisherFactory = match name {
        NiceTable::KIND => Arc::new(NiceTable::from_params),
        Json::KIND => Arc::new(Json::from_params),
        SqlTablePublisher::KIND => Arc::new(SqlTablePublisher::from_params),
        _ => return None,
    };
    Some(factory)
}

fn builtin_dialect(name: &str) -> Option<SqlDialect> {
    match name {
        "Mysql" => Some(SqlDialect::Mysql),
        "Pgsql" => Some(SqlDialect::Pgsql),
        "Sqlite" => Some(SqlDialect::Sqlite),
        _ => None,
    }
}

fn sql_backend_factory(dialect: SqlDialect) -> DatabaseFactory {
    Arc::new(
        move |params: ConnectionParams| -> Result<Arc<dyn BackendConnection>, DatabaseError> {
            Ok(Arc::new(SqlBackend::new(dialect, params)?))
        },
    )
}
