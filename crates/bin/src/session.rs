//! Documents loaded into a view for the duration of one command.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use arbor::{
    GraphView,
    action::ActionStack,
    content::{ContentId, Value, memory::InMemoryGraph},
    node::NodeId,
    service::{GraphViewService, ObjectProvider, PropertyProvider},
    settings::ViewSettings,
};

use crate::cli::DocumentArgs;

type BoxError = Box<dyn std::error::Error>;

/// JSON documents presented by one view, with the log of the edits made
/// through it.
pub struct Session {
    pub graph: Arc<InMemoryGraph>,
    pub view: GraphView,
    pub undo: Arc<ActionStack>,
    documents: Vec<(PathBuf, ContentId)>,
}

/// Loads view settings from a JSON file, or the defaults.
pub fn load_settings(path: Option<&Path>) -> Result<ViewSettings, BoxError> {
    let Some(path) = path else {
        return Ok(ViewSettings::default());
    };
    let text = fs::read_to_string(path)?;
    let settings = serde_json::from_str(&text)?;
    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

impl Session {
    /// Imports the documents and builds the view over them.
    pub fn open(args: &DocumentArgs, settings: ViewSettings) -> Result<Self, BoxError> {
        let graph = Arc::new(InMemoryGraph::new().with_collection_operations());
        let mut documents = Vec::with_capacity(args.files.len());
        for file in &args.files {
            let text = fs::read_to_string(file)?;
            let document: serde_json::Value = serde_json::from_str(&text)?;
            let id = graph.insert_json(&args.type_name, &document)?;
            tracing::debug!("Imported {} as {id}", file.display());
            documents.push((file.clone(), id));
        }

        let undo = Arc::new(ActionStack::new());
        let service = GraphViewService::new(settings).with_undo_service(undo.clone());
        let providers: Vec<Arc<dyn PropertyProvider>> = documents
            .iter()
            .map(|(_, id)| Arc::new(ObjectProvider::new(*id)) as Arc<dyn PropertyProvider>)
            .collect();
        let view = service
            .create_view(graph.clone(), &providers)?
            .ok_or("no document to present")?;

        Ok(Self {
            graph,
            view,
            undo,
            documents,
        })
    }

    pub fn root(&self) -> Result<NodeId, BoxError> {
        Ok(self.view.root().ok_or("the view has no root")?)
    }

    /// Finds the node at a dotted path starting with the root name.
    pub fn resolve(&self, path: &str) -> Result<NodeId, BoxError> {
        Ok(self.view.resolve_path(path)?)
    }

    /// Writes every document back to its file.
    pub fn save(&self) -> Result<(), BoxError> {
        for (file, id) in &self.documents {
            let document = self.graph.export_json(*id)?;
            fs::write(file, serde_json::to_string_pretty(&document)? + "\n")?;
            tracing::info!("Saved {}", file.display());
        }
        Ok(())
    }

    /// Current JSON of every document, keyed by file name.
    pub fn export(&self) -> Result<serde_json::Value, BoxError> {
        let mut exported = serde_json::Map::new();
        for (file, id) in &self.documents {
            exported.insert(file.display().to_string(), self.graph.export_json(*id)?);
        }
        Ok(serde_json::Value::Object(exported))
    }
}

/// Parses a value given on the command line.
pub fn parse_value(text: &str) -> Result<Value, BoxError> {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(text) else {
        return Ok(Value::Text(text.to_string()));
    };
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(value) => Value::Bool(value),
        serde_json::Value::Number(number) => match number.as_i64() {
            Some(int) => Value::Int(int),
            None => Value::Float(number.as_f64().ok_or("unsupported number")?),
        },
        serde_json::Value::String(text) => Value::Text(text),
        other => return Err(format!("only primitive values can be written, got {other}").into()),
    })
}
