//! In-memory model client shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use model_loader::config::LogSink;
use model_loader::schema::{ModelOptions, Relation, Schema};
use model_loader::{Config, Definition, Error, Loader, ModelClient, Result};

/// Records every call the loader makes instead of talking to a database
#[derive(Debug, Default)]
pub struct MemoryClient {
    ready_error: Option<String>,
    reject: Option<String>,
    pub created: Mutex<Vec<String>>,
}

impl MemoryClient {
    pub fn ready() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            ready_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Client whose `create_model` rejects the model `id`
    pub fn rejecting(id: &str) -> Self {
        Self {
            reject: Some(id.to_string()),
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }
}

#[derive(Debug)]
pub struct MemoryModelInner {
    pub id: String,
    pub schema: Schema,
    pub options: Option<ModelOptions>,
    pub relations: Mutex<Vec<(Relation, String)>>,
    pub touches: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct MemoryModel(pub Arc<MemoryModelInner>);

impl MemoryModel {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn touch(&self) {
        self.0.touches.fetch_add(1, Ordering::SeqCst);
    }

    pub fn touches(&self) -> usize {
        self.0.touches.load(Ordering::SeqCst)
    }

    pub fn relations(&self) -> Vec<(Relation, String)> {
        self.0.relations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for MemoryClient {
    type Model = MemoryModel;

    async fn connect(_config: &Config) -> Result<Self> {
        Ok(Self::ready())
    }

    async fn db_ready(&self) -> Result<()> {
        match &self.ready_error {
            Some(message) => Err(Error::DatabaseError(message.clone())),
            None => Ok(()),
        }
    }

    fn create_model(&self, id: &str, schema: &Schema, options: Option<&ModelOptions>) -> Result<MemoryModel> {
        if self.reject.as_deref() == Some(id) {
            return Err(Error::ModelRegistrationError(format!("schema of `{}` rejected", id)));
        }

        self.created.lock().unwrap().push(id.to_string());
        Ok(MemoryModel(Arc::new(MemoryModelInner {
            id: id.to_string(),
            schema: schema.clone(),
            options: options.cloned(),
            relations: Mutex::new(Vec::new()),
            touches: AtomicUsize::new(0),
        })))
    }

    fn relate(&self, model: &MemoryModel, relation: &Relation, target: &MemoryModel) -> Result<()> {
        model
            .0
            .relations
            .lock()
            .unwrap()
            .push((relation.clone(), target.id().to_string()));
        Ok(())
    }
}

pub type Hook = Box<dyn Fn(&Loader<MemoryClient>, &MemoryModel, &[Value]) -> Result<()> + Send>;

/// Definition assembled field by field in each test
#[derive(Default)]
pub struct TestDefinition {
    pub table_name: Option<String>,
    pub global_id: Option<String>,
    pub schema: Schema,
    pub options: Option<ModelOptions>,
    pub hook: Option<Hook>,
}

impl TestDefinition {
    pub fn table(name: &str) -> Self {
        Self {
            table_name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn global(id: &str) -> Self {
        Self {
            global_id: Some(id.to_string()),
            ..Self::default()
        }
    }

    pub fn on_initialize<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Loader<MemoryClient>, &MemoryModel, &[Value]) -> Result<()> + Send + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }
}

impl Definition<MemoryClient> for TestDefinition {
    fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    fn global_id(&self) -> Option<&str> {
        self.global_id.as_deref()
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn options(&self) -> Option<&ModelOptions> {
        self.options.as_ref()
    }

    fn initialize(&mut self, loader: &Loader<MemoryClient>, model: &MemoryModel, args: &[Value]) -> Result<()> {
        match &self.hook {
            Some(hook) => hook(loader, model, args),
            None => Ok(()),
        }
    }
}

/// Sink that stores every message, and a handle to read them back
pub fn capture_sink() -> (LogSink, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let captured = lines.clone();
    let sink: LogSink = Arc::new(move |message: &str| captured.lock().unwrap().push(message.to_string()));
    (sink, lines)
}
