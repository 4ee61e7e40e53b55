use helm_values_core::{Chart, ChartDependency, Error, HELM_CHART_FILE, HELM_VALUES_FILE, SchemaIo};
use serde_json::{Map, Value};
use vfs::VfsPath;

const GLOBAL: &str = "global";

/// Deep merge where `a` wins on conflict and `b` only fills gaps.
///
/// Objects merge key by key, any other value of `a` replaces the one of `b`.
#[must_use]
pub fn merge_prefer_left(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Null, vb) => vb,
        (Value::Object(mut ma), Value::Object(mb)) => {
            for (k, vb) in mb {
                let entry = ma.entry(k).or_insert(Value::Null);
                *entry = merge_prefer_left(entry.take(), vb);
            }
            Value::Object(ma)
        }
        (va, _) => va,
    }
}

/// Combines the default values of every extracted dependency into one document.
///
/// The document is keyed by alias or name at every level, mirroring the
/// layout written by [`crate::SchemaExtractor`]. Values set by an ancestor
/// take precedence over the defaults of a dependency, and the `global`
/// section of every ancestor is propagated to all of its descendants.
#[derive(Debug, Clone)]
pub struct ExtractedValuesAggregator {
    extract_dir: VfsPath,
    io: SchemaIo,
}

impl ExtractedValuesAggregator {
    #[must_use]
    pub fn new(extract_dir: VfsPath, io: SchemaIo) -> Self {
        Self { extract_dir, io }
    }

    /// # Errors
    ///
    /// Returns an error if the extract directory cannot be traversed.
    pub fn aggregate(&self, chart: &Chart) -> Result<Value, Error> {
        let mut values = Map::new();
        self.aggregate_into(
            &mut values,
            &self.extract_dir,
            &chart.dependencies,
            &Value::Null,
        )?;
        Ok(Value::Object(values))
    }

    fn aggregate_into(
        &self,
        parent: &mut Map<String, Value>,
        dir: &VfsPath,
        dependencies: &[ChartDependency],
        ancestor_global: &Value,
    ) -> Result<(), Error> {
        for dependency in dependencies {
            if dependency.version.is_none() {
                continue;
            }
            let alias = dependency.alias_or_name();
            let dependency_dir = dir.join(alias)?;
            if !dependency_dir.is_dir()? {
                continue;
            }

            let own = self.read_values(&dependency_dir.join(HELM_VALUES_FILE)?);
            let slot = parent
                .entry(alias.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            *slot = merge_prefer_left(slot.take(), own);
            if !slot.is_object() {
                tracing::warn!(
                    dependency = alias,
                    "values of dependency are overridden by a non-object value"
                );
                continue;
            }

            let own_global = slot.get(GLOBAL).cloned().unwrap_or(Value::Null);
            let global = merge_prefer_left(ancestor_global.clone(), own_global);
            let Value::Object(slot) = slot else {
                continue;
            };
            if global.is_object() {
                slot.insert(GLOBAL.to_string(), global.clone());
            }

            if dependency_dir.join(HELM_CHART_FILE)?.is_file()? {
                match Chart::load(&dependency_dir) {
                    Ok(nested) => {
                        self.aggregate_into(slot, &dependency_dir, &nested.dependencies, &global)?;
                    }
                    Err(err) => tracing::warn!(
                        dependency = alias,
                        error = %err,
                        "cannot read extracted chart manifest"
                    ),
                }
            }
        }
        Ok(())
    }

    fn read_values(&self, path: &VfsPath) -> Value {
        match path.is_file() {
            Ok(true) => {}
            _ => return Value::Null,
        }
        match self.io.read_yaml::<Value>(path) {
            Ok(values) => values,
            Err(err) => {
                tracing::warn!(path = path.as_str(), error = %err, "ignoring unreadable values file");
                Value::Null
            }
        }
    }
}
