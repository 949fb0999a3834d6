use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use exdir_types::{AttrMap, AttrValue, DatasetValue};
use tracing::debug;

use crate::error::{PluginError, PluginResult};
use crate::order::resolve_order;
use crate::plugin::{Capability, Direction, Plugin};
use crate::stage::{AttributeWrite, DatasetWrite, ReadContext};

/// Meta key under which plugin markers are stored.
pub const PLUGINS_KEY: &str = "plugins";

/// The plugins enabled for one file, with their execution orders
/// resolved up front.
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    plugins: Vec<Plugin>,
    orders: BTreeMap<(Capability, Direction), Vec<usize>>,
}

impl Pipeline {
    /// Validate names and resolve every order.
    ///
    /// Fails on duplicate names or on a dependency cycle for any
    /// capability and direction.
    pub fn new(plugins: Vec<Plugin>) -> PluginResult<Self> {
        let mut seen = HashSet::new();
        for plugin in &plugins {
            if !seen.insert(plugin.name()) {
                return Err(PluginError::DuplicatePlugin(plugin.name().to_string()));
            }
        }

        let mut orders = BTreeMap::new();
        for capability in Capability::ALL {
            for direction in [Direction::Write, Direction::Read] {
                let order = resolve_order(&plugins, capability, direction)?;
                orders.insert((capability, direction), order);
            }
        }
        debug!(count = plugins.len(), "plugin pipeline resolved");
        Ok(Self { plugins, orders })
    }

    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    fn ordered(
        &self,
        capability: Capability,
        direction: Direction,
    ) -> impl Iterator<Item = &Plugin> + '_ {
        self.orders
            .get(&(capability, direction))
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&i| &self.plugins[i])
    }

    /// Plugin names in the order they run.
    pub fn order(&self, capability: Capability, direction: Direction) -> Vec<&str> {
        self.ordered(capability, direction).map(Plugin::name).collect()
    }

    /// Run the dataset write stages.
    ///
    /// Record contributions are merged key by key, later stages winning.
    /// Every required stage also marks itself in the meta record.
    pub fn write_dataset(&self, value: DatasetValue) -> PluginResult<DatasetWrite> {
        let mut out = DatasetWrite::new(value);
        for plugin in self.ordered(Capability::Dataset, Direction::Write) {
            let Some(stage) = plugin.dataset_stage() else {
                continue;
            };
            let step = stage.prepare_write(out.value)?;
            out.value = step.value;
            merge_into(&mut out.attrs, step.attrs);
            merge_into(&mut out.meta, step.meta);
            if plugin.is_required() {
                merge_into(&mut out.meta, required_marker(plugin.name()));
            }
        }
        Ok(out)
    }

    /// Run the dataset read stages after checking required markers.
    pub fn read_dataset(
        &self,
        value: DatasetValue,
        attrs: &AttrMap,
        meta: &AttrMap,
    ) -> PluginResult<DatasetValue> {
        self.check_required(meta)?;
        let context = ReadContext { attrs, meta };
        let mut value = value;
        for plugin in self.ordered(Capability::Dataset, Direction::Read) {
            if let Some(stage) = plugin.dataset_stage() {
                value = stage.prepare_read(value, &context)?;
            }
        }
        Ok(value)
    }

    /// Run the attribute write stages over a whole record.
    ///
    /// Required stages mark themselves in the meta record, as for datasets.
    pub fn write_attributes(&self, attrs: AttrMap) -> PluginResult<AttributeWrite> {
        let mut out = AttributeWrite::new(attrs);
        for plugin in self.ordered(Capability::Attribute, Direction::Write) {
            let Some(stage) = plugin.attribute_stage() else {
                continue;
            };
            let step = stage.prepare_write(out.attrs)?;
            out.attrs = step.attrs;
            merge_into(&mut out.meta, step.meta);
            if plugin.is_required() {
                merge_into(&mut out.meta, required_marker(plugin.name()));
            }
        }
        Ok(out)
    }

    pub fn read_attributes(&self, attrs: AttrMap, meta: &AttrMap) -> PluginResult<AttrMap> {
        self.check_required(meta)?;
        let mut attrs = attrs;
        for plugin in self.ordered(Capability::Attribute, Direction::Read) {
            if let Some(stage) = plugin.attribute_stage() {
                attrs = stage.prepare_read(attrs, meta)?;
            }
        }
        Ok(attrs)
    }

    /// Run the creation hooks for a group, file or raw directory and
    /// collect their meta contributions.
    pub fn create_object(
        &self,
        capability: Capability,
        name: &str,
        directory: &Path,
    ) -> PluginResult<AttrMap> {
        let mut meta = AttrMap::new();
        for plugin in self.ordered(capability, Direction::Write) {
            if let Some(stage) = plugin.object_stage(capability) {
                merge_into(&mut meta, stage.on_create(name, directory)?);
            }
        }
        Ok(meta)
    }

    /// Fail if `meta` marks a plugin required that is not enabled.
    ///
    /// Dataset and attribute stages share one meta record, so a marker
    /// left by either kind of stage guards both reads.
    pub fn check_required(&self, meta: &AttrMap) -> PluginResult<()> {
        let Some(markers) = meta.get(PLUGINS_KEY).and_then(AttrValue::as_map) else {
            return Ok(());
        };
        let enabled: HashSet<&str> = self.plugins.iter().map(Plugin::name).collect();
        for (name, marker) in markers {
            let required = marker
                .as_map()
                .and_then(|m| m.get("required"))
                .and_then(AttrValue::as_bool)
                .unwrap_or(false);
            if required && !enabled.contains(name.as_str()) {
                return Err(PluginError::MissingRequiredPlugin(name.clone()));
            }
        }
        Ok(())
    }
}

/// `{plugins: {<name>: {required: true}}}`
fn required_marker(name: &str) -> AttrMap {
    let flag: AttrValue = [("required", true)].into_iter().collect();
    let entry: AttrValue = [(name, flag)].into_iter().collect();
    AttrMap::from([(PLUGINS_KEY.to_string(), entry)])
}

/// Recursively merge `src` into `dst`. Nested maps merge; anything else
/// is replaced.
pub fn merge_into(dst: &mut AttrMap, src: AttrMap) {
    for (key, value) in src {
        let incoming = match value {
            AttrValue::Map(incoming) => incoming,
            other => {
                dst.insert(key, other);
                continue;
            }
        };
        if let Some(AttrValue::Map(existing)) = dst.get_mut(&key) {
            merge_into(existing, incoming);
            continue;
        }
        dst.insert(key, AttrValue::Map(incoming));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{AttributeStage, DatasetStage};
    use exdir_types::{ArrayValue, DType, ErrorKind};
    use std::sync::{Arc, Mutex};

    /// Records the order stages run in.
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl DatasetStage for Recorder {
        fn prepare_write(&self, value: DatasetValue) -> PluginResult<DatasetWrite> {
            self.log.lock().unwrap().push(format!("w:{}", self.name));
            let mut out = DatasetWrite::new(value);
            out.attrs.insert("last".into(), self.name.into());
            Ok(out)
        }

        fn prepare_read(
            &self,
            value: DatasetValue,
            _context: &ReadContext<'_>,
        ) -> PluginResult<DatasetValue> {
            self.log.lock().unwrap().push(format!("r:{}", self.name));
            Ok(value)
        }
    }

    /// Stores data as float32 and restores float64 on read.
    struct Narrow;

    impl DatasetStage for Narrow {
        fn prepare_write(&self, value: DatasetValue) -> PluginResult<DatasetWrite> {
            let mut out = DatasetWrite::new(value.map_array(|a| a.cast(DType::F32)));
            out.meta.insert("narrowed".into(), true.into());
            Ok(out)
        }

        fn prepare_read(
            &self,
            value: DatasetValue,
            context: &ReadContext<'_>,
        ) -> PluginResult<DatasetValue> {
            if context.meta.get("narrowed").and_then(AttrValue::as_bool) != Some(true) {
                return Err(PluginError::stage("narrow", "dataset was not narrowed"));
            }
            Ok(value.map_array(|a| a.cast(DType::F64)))
        }
    }

    struct Uppercase;

    impl AttributeStage for Uppercase {
        fn prepare_write(&self, attrs: AttrMap) -> PluginResult<AttributeWrite> {
            let attrs = attrs
                .into_iter()
                .map(|(k, v)| match v {
                    AttrValue::String(s) => (k, AttrValue::String(s.to_uppercase())),
                    other => (k, other),
                })
                .collect();
            Ok(AttributeWrite {
                attrs,
                meta: [("case".to_string(), AttrValue::from("upper"))].into(),
            })
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Recorder {
        Recorder {
            name,
            log: Arc::clone(log),
        }
    }

    #[test]
    fn stages_run_in_resolved_order_and_last_write_wins() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![
            Plugin::new("c").write_after(["b"]).dataset(recorder("c", &log)),
            Plugin::new("a").write_before(["c"]).read_after(["c"]).dataset(recorder("a", &log)),
            Plugin::new("b").write_after(["a"]).dataset(recorder("b", &log)),
        ])
        .unwrap();
        assert_eq!(pipeline.order(Capability::Dataset, Direction::Write), ["a", "b", "c"]);

        let out = pipeline.write_dataset(vec![1.0f64].into()).unwrap();
        assert_eq!(out.attrs["last"].as_str(), Some("c"));

        pipeline
            .read_dataset(out.value, &AttrMap::new(), &AttrMap::new())
            .unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            ["w:a", "w:b", "w:c", "r:c", "r:a", "r:b"]
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = Pipeline::new(vec![Plugin::new("x"), Plugin::new("x")]).unwrap_err();
        assert!(matches!(err, PluginError::DuplicatePlugin(name) if name == "x"));
    }

    #[test]
    fn cycles_fail_at_construction() {
        let err = Pipeline::new(vec![
            Plugin::new("a").read_before(["b"]).dataset(Narrow),
            Plugin::new("b").read_before(["a"]).dataset(Narrow),
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CircularDependency);
    }

    #[test]
    fn transform_roundtrip_through_meta() {
        let pipeline = Pipeline::new(vec![Plugin::new("narrow").dataset(Narrow)]).unwrap();
        let out = pipeline.write_dataset(vec![1.5f64, 2.5].into()).unwrap();
        assert_eq!(out.value.dtype(), DType::F32);

        let back = pipeline
            .read_dataset(out.value, &out.attrs, &out.meta)
            .unwrap();
        assert_eq!(back, DatasetValue::from(ArrayValue::from(vec![1.5f64, 2.5])));

        let err = pipeline
            .read_dataset(vec![1.0f32].into(), &AttrMap::new(), &AttrMap::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Plugin);
    }

    #[test]
    fn required_plugins_are_marked_and_enforced() {
        let writer = Pipeline::new(vec![
            Plugin::new("narrow").dataset(Narrow).required(true),
        ])
        .unwrap();
        let out = writer.write_dataset(vec![1.0f64].into()).unwrap();
        let marker = out.meta["plugins"].as_map().unwrap()["narrow"].as_map().unwrap();
        assert_eq!(marker["required"], AttrValue::Bool(true));
        // The stage's own meta survives next to the marker.
        assert_eq!(out.meta["narrowed"], AttrValue::Bool(true));

        let reader = Pipeline::default();
        let err = reader
            .read_dataset(out.value.clone(), &out.attrs, &out.meta)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredPlugin);

        assert!(writer.read_dataset(out.value, &out.attrs, &out.meta).is_ok());
    }

    #[test]
    fn attribute_stages_transform_whole_records() {
        let pipeline = Pipeline::new(vec![Plugin::new("upper").attribute(Uppercase)]).unwrap();
        let mut attrs = AttrMap::new();
        attrs.insert("label".into(), "soma".into());
        attrs.insert("n".into(), 3.into());

        let out = pipeline.write_attributes(attrs).unwrap();
        assert_eq!(out.attrs["label"].as_str(), Some("SOMA"));
        assert_eq!(out.attrs["n"], AttrValue::Int(3));
        assert_eq!(out.meta["case"].as_str(), Some("upper"));

        let read = pipeline.read_attributes(out.attrs.clone(), &out.meta).unwrap();
        assert_eq!(read, out.attrs);
    }

    #[test]
    fn required_attribute_plugins_are_enforced() {
        let writer = Pipeline::new(vec![
            Plugin::new("upper").attribute(Uppercase).required(true),
        ])
        .unwrap();
        let attrs: AttrMap = [("label".to_string(), AttrValue::from("abc"))].into();
        let out = writer.write_attributes(attrs).unwrap();
        let marker = out.meta["plugins"].as_map().unwrap()["upper"].as_map().unwrap();
        assert_eq!(marker["required"], AttrValue::Bool(true));

        let err = Pipeline::default()
            .read_attributes(out.attrs.clone(), &out.meta)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredPlugin);
        assert!(writer.read_attributes(out.attrs, &out.meta).is_ok());

        // The shared meta record does not block dataset reads when the
        // plugin is enabled.
        assert!(writer
            .read_dataset(vec![1.0f64].into(), &AttrMap::new(), &out.meta)
            .is_ok());
    }

    #[test]
    fn object_hooks_collect_meta() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(vec![Plugin::new("stamp").group(
            |name: &str, _: &Path| -> PluginResult<AttrMap> {
                Ok([("created_by".to_string(), AttrValue::from(name))].into())
            },
        )])
        .unwrap();
        let meta = pipeline
            .create_object(Capability::Group, "trial", dir.path())
            .unwrap();
        assert_eq!(meta["created_by"].as_str(), Some("trial"));
        assert!(pipeline
            .create_object(Capability::File, "trial", dir.path())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn merge_is_recursive() {
        let mut dst: AttrMap = [(
            "plugins".to_string(),
            [("a", AttrValue::from(1))].into_iter().collect(),
        )]
        .into();
        let src: AttrMap = [(
            "plugins".to_string(),
            [("b", AttrValue::from(2))].into_iter().collect(),
        )]
        .into();
        merge_into(&mut dst, src);
        assert_eq!(dst["plugins"].as_map().unwrap().len(), 2);
    }
}
