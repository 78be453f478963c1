//! Persistent storage for deployment features.
//!
//! Features are kept in memory keyed by id and moved to and from GeoJSON
//! documents: a folder tree with one feature per file, a single
//! FeatureCollection file, or a GitHub gist.

pub mod gist;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use geojson::{feature::Id, FeatureCollection, GeoJson, JsonValue};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Config, DataLocation};
use crate::error::{Error, Result};
use crate::feature::{DeploymentFeature, Subtype, SUBTYPE_PROPERTY};
use crate::geo::ElevationClient;

pub use gist::GistClient;

/// Outcome of a bulk load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Features accepted into the store.
    pub loaded: usize,
    /// Features or files that could not be read.
    pub failed: usize,
}

impl LoadSummary {
    fn absorb(&mut self, other: LoadSummary) {
        self.loaded += other.loaded;
        self.failed += other.failed;
    }
}

/// Outcome of filling in point altitudes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AltitudeSummary {
    /// Points given a new altitude.
    pub updated: usize,
    /// Points whose lookup failed.
    pub failed: usize,
}

/// In-memory set of deployment features keyed by id.
#[derive(Debug, Clone)]
pub struct Datastore {
    features: BTreeMap<String, DeploymentFeature>,
    default_subtype: Subtype,
}

impl Default for Datastore {
    fn default() -> Self {
        Self::new(Subtype::Site)
    }
}

impl Datastore {
    /// Create an empty store; features without a subtype get `default_subtype`.
    #[must_use]
    pub fn new(default_subtype: Subtype) -> Self {
        Self {
            features: BTreeMap::new(),
            default_subtype,
        }
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Feature by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DeploymentFeature> {
        self.features.get(id)
    }

    /// All features in id order.
    pub fn all(&self) -> impl Iterator<Item = &DeploymentFeature> {
        self.features.values()
    }

    /// Mutable access to all features in id order.
    pub fn features_mut(&mut self) -> impl Iterator<Item = &mut DeploymentFeature> {
        self.features.values_mut()
    }

    /// Features of one subtype.
    pub fn by_subtype(&self, subtype: Subtype) -> impl Iterator<Item = &DeploymentFeature> {
        self.all()
            .filter(move |feature| feature.subtype() == Some(subtype))
    }

    /// Site features.
    pub fn sites(&self) -> impl Iterator<Item = &DeploymentFeature> {
        self.by_subtype(Subtype::Site)
    }

    /// Mountpoint features.
    pub fn mountpoints(&self) -> impl Iterator<Item = &DeploymentFeature> {
        self.by_subtype(Subtype::Mountpoint)
    }

    /// Observation features.
    pub fn observations(&self) -> impl Iterator<Item = &DeploymentFeature> {
        self.by_subtype(Subtype::Observation)
    }

    /// Validate a GeoJSON feature and add it, replacing any feature with the
    /// same id. Returns the id it was stored under.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFeature` if the geometry is missing or the subtype is
    /// not recognised.
    pub fn add(&mut self, feature: geojson::Feature) -> Result<String> {
        let id = match &feature.id {
            Some(Id::String(id)) => id.clone(),
            Some(Id::Number(id)) => id.to_string(),
            None => content_id(&feature)?,
        };
        check_file_stem(&id)?;
        let geometry = feature
            .geometry
            .ok_or_else(|| Error::invalid_feature(&id, "missing geometry"))?;
        let properties = feature.properties.unwrap_or_default();

        let mut new_feature = DeploymentFeature::new(id.clone(), geometry, properties);
        match new_feature.properties().get(SUBTYPE_PROPERTY) {
            None | Some(JsonValue::Null) => {
                warn!(
                    "{id} subtype not specified, assigning {}",
                    self.default_subtype
                );
                new_feature.set_subtype(self.default_subtype);
            }
            Some(JsonValue::String(value)) => {
                let subtype: Subtype = value
                    .parse()
                    .map_err(|_| Error::invalid_feature(&id, format!("unknown subtype '{value}'")))?;
                new_feature.set_subtype(subtype);
            }
            Some(other) => {
                return Err(Error::invalid_feature(
                    &id,
                    format!("subtype must be a string, got {other}"),
                ))
            }
        }

        self.insert(new_feature);
        Ok(id)
    }

    /// Store an already validated feature, replacing any with the same id.
    pub fn insert(&mut self, feature: DeploymentFeature) {
        self.features.insert(feature.id().to_string(), feature);
    }

    fn add_all(&mut self, features: Vec<geojson::Feature>) -> LoadSummary {
        let mut summary = LoadSummary::default();
        for feature in features {
            match self.add(feature) {
                Ok(id) => {
                    debug!("Added feature {id}");
                    summary.loaded += 1;
                }
                Err(e) => {
                    warn!("Failed to add feature: {e}");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Load every GeoJSON file below `folder`, recursively.
    ///
    /// Unreadable files are logged and counted as failures.
    ///
    /// # Errors
    ///
    /// Returns an error if `folder` is not a readable directory.
    pub fn load_folder(&mut self, folder: &Path) -> Result<LoadSummary> {
        if !folder.is_dir() {
            return Err(Error::file_access(
                folder,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        let mut summary = LoadSummary::default();
        let mut pending = vec![folder.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let entries = fs::read_dir(&dir).map_err(|e| Error::file_access(&dir, e))?;
            for entry in entries {
                let path = entry.map_err(|e| Error::file_access(&dir, e))?.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                match read_features(&path) {
                    Ok(features) => summary.absorb(self.add_all(features)),
                    Err(e) => {
                        warn!("Unable to load {}: {e}", path.display());
                        summary.failed += 1;
                    }
                }
            }
        }

        info!(
            "Loaded {} features from {} ({} failed)",
            summary.loaded,
            folder.display(),
            summary.failed
        );
        Ok(summary)
    }

    /// Save every feature as `<folder>/<subtype>-objects/<id>.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or file cannot be written.
    pub fn write_folder(&self, folder: &Path) -> Result<usize> {
        for feature in self.all() {
            let subtype = feature.subtype().unwrap_or(self.default_subtype);
            let sub_path = folder.join(subtype.folder_name());
            create_dir(&sub_path)?;
            check_file_stem(feature.id())?;
            let full_path = sub_path.join(format!("{}.json", feature.id()));
            let text = to_pretty_json(&feature.to_geojson())?;
            fs::write(&full_path, text).map_err(|e| Error::file_access(&full_path, e))?;
        }
        info!("Wrote {} features to {}", self.len(), folder.display());
        Ok(self.len())
    }

    /// Load features from a single GeoJSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_geojson_file(&mut self, path: &Path) -> Result<LoadSummary> {
        let summary = self.add_all(read_features(path)?);
        info!(
            "Loaded {} features from {} ({} failed)",
            summary.loaded,
            path.display(),
            summary.failed
        );
        Ok(summary)
    }

    /// Save all features as one FeatureCollection.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_geojson_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir(parent)?;
        }
        fs::write(path, self.to_geojson_string()?).map_err(|e| Error::file_access(path, e))?;
        info!("Wrote {} features to {}", self.len(), path.display());
        Ok(())
    }

    /// Load a FeatureCollection stored in a gist.
    ///
    /// # Errors
    ///
    /// Returns an error if the gist cannot be fetched or parsed.
    pub async fn load_gist(&mut self, client: &GistClient, gist_id: &str) -> Result<LoadSummary> {
        let text = client.fetch_collection(gist_id).await?;
        let summary = self.add_all(parse_features(&text)?);
        info!("Loaded {} features from gist {gist_id}", summary.loaded);
        Ok(summary)
    }

    /// Save all features to `<gist_id>.geojson` in a gist.
    ///
    /// # Errors
    ///
    /// Returns an error if the gist cannot be updated.
    pub async fn write_gist(&self, client: &GistClient, gist_id: &str) -> Result<()> {
        let file_name = format!("{gist_id}.geojson");
        client
            .update_file(gist_id, &file_name, &self.to_geojson_string()?)
            .await?;
        info!("Saved {} features to gist {gist_id}", self.len());
        Ok(())
    }

    /// Load from a configured location.
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be read.
    pub async fn load_location(
        &mut self,
        location: DataLocation,
        config: &Config,
        http: &Client,
    ) -> Result<LoadSummary> {
        match location {
            DataLocation::Folder => self.load_folder(&config.datastore.folder),
            DataLocation::File => self.load_geojson_file(&config.datastore.file),
            DataLocation::Gist => {
                let client = GistClient::new(http.clone(), &config.github);
                self.load_gist(&client, config.gist_id()?).await
            }
            DataLocation::None => Ok(LoadSummary::default()),
        }
    }

    /// Save to a configured location. Returns a description of where the
    /// features went, or `None` when saving is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be written.
    pub async fn save_location(
        &self,
        location: DataLocation,
        config: &Config,
        http: &Client,
    ) -> Result<Option<String>> {
        match location {
            DataLocation::Folder => {
                self.write_folder(&config.datastore.folder)?;
                Ok(Some(config.datastore.folder.display().to_string()))
            }
            DataLocation::File => {
                self.write_geojson_file(&config.datastore.file)?;
                Ok(Some(config.datastore.file.display().to_string()))
            }
            DataLocation::Gist => {
                let client = GistClient::new(http.clone(), &config.github);
                let gist_id = config.gist_id()?;
                self.write_gist(&client, gist_id).await?;
                Ok(Some(format!("gist {gist_id}")))
            }
            DataLocation::None => Ok(None),
        }
    }

    /// Look up the altitude of every point feature, `offset` metres above
    /// ground.
    ///
    /// A failed lookup is logged and counted, and the remaining points are
    /// still tried.
    pub async fn infer_altitudes(
        &mut self,
        elevation: &ElevationClient,
        offset: f64,
    ) -> AltitudeSummary {
        let mut summary = AltitudeSummary::default();
        for feature in self.features.values_mut() {
            match feature.infer_altitude(elevation, offset).await {
                Ok(true) => summary.updated += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("No altitude for {}: {e}", feature.id());
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// All features as a FeatureCollection sorted by id, keys sorted,
    /// indented with four spaces.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_geojson_string(&self) -> Result<String> {
        collection_string(self.all())
    }
}

/// Serialize features as a pretty FeatureCollection document.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn collection_string<'a>(
    features: impl IntoIterator<Item = &'a DeploymentFeature>,
) -> Result<String> {
    let mut features: Vec<geojson::Feature> = features
        .into_iter()
        .map(DeploymentFeature::to_geojson)
        .collect();
    features.sort_by(|a, b| feature_id(a).cmp(&feature_id(b)));
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    to_pretty_json(&collection)
}

fn feature_id(feature: &geojson::Feature) -> String {
    match &feature.id {
        Some(Id::String(id)) => id.clone(),
        Some(Id::Number(id)) => id.to_string(),
        None => String::new(),
    }
}

/// Deterministic id for features that arrive without one.
fn content_id(feature: &geojson::Feature) -> Result<String> {
    let bytes = serde_json::to_vec(&(&feature.geometry, &feature.properties))?;
    let hash = blake3::hash(&bytes).to_hex();
    Ok(hash.as_str()[..16].to_string())
}

/// Feature ids double as file names in a folder datastore.
fn check_file_stem(id: &str) -> Result<()> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
        return Err(Error::invalid_feature(id, "id cannot be used as a file name"));
    }
    Ok(())
}

fn to_pretty_json(value: &impl Serialize) -> Result<String> {
    // Round-trip through a Value so object keys come out sorted
    let value = serde_json::to_value(value)?;
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    out.push(b'\n');
    String::from_utf8(out).map_err(|e| Error::internal(e.to_string()))
}

fn read_features(path: &Path) -> Result<Vec<geojson::Feature>> {
    let text = fs::read_to_string(path).map_err(|e| Error::file_access(path, e))?;
    parse_features(&text)
}

fn parse_features(text: &str) -> Result<Vec<geojson::Feature>> {
    match text.parse::<GeoJson>()? {
        GeoJson::Feature(feature) => Ok(vec![feature]),
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Geometry(_) => Err(Error::invalid_feature(
            "<unnamed>",
            "document is a bare geometry, not a feature",
        )),
    }
}

fn create_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|source| Error::DirectoryCreate {
            path: PathBuf::from(path),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ElevationConfig, GithubConfig};
    use crate::http::stub::StubServer;
    use serde_json::json;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": "pole-2",
             "geometry": {"type": "Point", "coordinates": [-122.1471, 37.4845]},
             "properties": {"desc": "Pole 2", "subtype": "site"}},
            {"type": "Feature", "id": "mp-1",
             "geometry": {"type": "Point", "coordinates": [-122.1472, 37.4846, 10.0]},
             "properties": {"desc": "Pole 2 North", "subtype": "mountpoint"}},
            {"type": "Feature", "id": 7,
             "geometry": {"type": "LineString", "coordinates": [[-122.1471, 37.4845], [-122.1480, 37.4850]]},
             "properties": {"desc": "Link A", "subtype": "observation"}}
        ]
    }"#;

    fn feature(json: &str) -> geojson::Feature {
        match json.parse::<GeoJson>().unwrap() {
            GeoJson::Feature(feature) => feature,
            _ => panic!("expected a feature"),
        }
    }

    fn loaded_store() -> Datastore {
        let mut store = Datastore::default();
        let summary = store.add_all(parse_features(COLLECTION).unwrap());
        assert_eq!(summary, LoadSummary { loaded: 3, failed: 0 });
        store
    }

    #[test]
    fn test_add_and_views() {
        let store = loaded_store();
        assert_eq!(store.len(), 3);
        assert_eq!(store.sites().count(), 1);
        assert_eq!(store.mountpoints().count(), 1);
        assert_eq!(store.observations().count(), 1);
        assert!(store.get("7").is_some());
        let ids: Vec<&str> = store.all().map(DeploymentFeature::id).collect();
        assert_eq!(ids, vec!["7", "mp-1", "pole-2"]);
    }

    #[test]
    fn test_add_assigns_default_subtype() {
        let mut store = Datastore::new(Subtype::Mountpoint);
        let id = store
            .add(feature(
                r#"{"type": "Feature", "id": "x",
                    "geometry": {"type": "Point", "coordinates": [1, 2]}, "properties": null}"#,
            ))
            .unwrap();
        assert_eq!(store.get(&id).unwrap().subtype(), Some(Subtype::Mountpoint));
    }

    #[test]
    fn test_add_rejects_unknown_subtype() {
        let mut store = Datastore::default();
        let err = store
            .add(feature(
                r#"{"type": "Feature", "id": "x",
                    "geometry": {"type": "Point", "coordinates": [1, 2]},
                    "properties": {"subtype": "lamp"}}"#,
            ))
            .unwrap_err();
        assert!(err.to_string().contains("lamp"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_rejects_missing_geometry() {
        let mut store = Datastore::default();
        let err = store
            .add(feature(
                r#"{"type": "Feature", "id": "x", "geometry": null, "properties": {}}"#,
            ))
            .unwrap_err();
        assert!(err.to_string().contains("missing geometry"));
    }

    #[test]
    fn test_add_without_id_is_deterministic() {
        let json = r#"{"type": "Feature",
            "geometry": {"type": "Point", "coordinates": [1, 2]},
            "properties": {"subtype": "site"}}"#;
        let mut store = Datastore::default();
        let first = store.add(feature(json)).unwrap();
        let second = store.add(feature(json)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 16);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_geojson_string_sorted_and_indented() {
        let text = loaded_store().to_geojson_string().unwrap();
        let first = text.find("\"7\"").unwrap();
        let second = text.find("\"mp-1\"").unwrap();
        let third = text.find("\"pole-2\"").unwrap();
        assert!(first < second && second < third);
        assert!(text.contains("\n    \"features\""));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("deployment.geojson");
        let store = loaded_store();
        store.write_geojson_file(&path).unwrap();

        let mut reloaded = Datastore::default();
        let summary = reloaded.load_geojson_file(&path).unwrap();
        assert_eq!(summary.loaded, 3);
        assert_eq!(
            reloaded.get("mp-1").unwrap(),
            store.get("mp-1").unwrap()
        );
    }

    #[test]
    fn test_folder_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = loaded_store();
        assert_eq!(store.write_folder(dir.path()).unwrap(), 3);
        assert!(dir.path().join("site-objects").join("pole-2.json").exists());
        assert!(dir
            .path()
            .join("mountpoint-objects")
            .join("mp-1.json")
            .exists());

        let mut reloaded = Datastore::default();
        let summary = reloaded.load_folder(dir.path()).unwrap();
        assert_eq!(summary, LoadSummary { loaded: 3, failed: 0 });
        assert_eq!(reloaded.len(), 3);
    }

    #[test]
    fn test_load_folder_counts_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested").join("ok.json"),
            r#"{"type": "Feature", "id": "a",
                "geometry": {"type": "Point", "coordinates": [1, 2]},
                "properties": {"subtype": "site"}}"#,
        )
        .unwrap();

        let mut store = Datastore::default();
        let summary = store.load_folder(dir.path()).unwrap();
        assert_eq!(summary, LoadSummary { loaded: 1, failed: 1 });
    }

    #[test]
    fn test_load_folder_missing() {
        let mut store = Datastore::default();
        assert!(store.load_folder(Path::new("/nonexistent/features")).is_err());
    }

    #[test]
    fn test_parse_rejects_bare_geometry() {
        assert!(parse_features(r#"{"type": "Point", "coordinates": [1, 2]}"#).is_err());
    }

    #[tokio::test]
    async fn test_location_none_is_noop() {
        let mut store = Datastore::default();
        let config = Config::default();
        let http = Client::new();
        let summary = store
            .load_location(DataLocation::None, &config, &http)
            .await
            .unwrap();
        assert_eq!(summary, LoadSummary::default());
        let saved = store
            .save_location(DataLocation::None, &config, &http)
            .await
            .unwrap();
        assert!(saved.is_none());
    }

    #[test]
    fn test_add_rejects_ids_unfit_for_file_names() {
        let mut store = Datastore::default();
        for id in ["../escape", "a/b", "..", "a\\b"] {
            let json = json!({
                "type": "Feature",
                "id": id,
                "geometry": {"type": "Point", "coordinates": [1, 2]},
                "properties": {"subtype": "site"}
            });
            let err = store.add(feature(&json.to_string())).unwrap_err();
            assert!(err.to_string().contains("file name"), "{id}: {err}");
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_write_folder_refuses_unsafe_inserted_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Datastore::default();
        store.insert(DeploymentFeature::new(
            "../../outside",
            geojson::Geometry::new(geojson::Value::Point(vec![1.0, 2.0])),
            geojson::JsonObject::new(),
        ));
        assert!(store.write_folder(&dir.path().join("objects")).is_err());
        assert!(!dir.path().join("outside.json").exists());
    }

    fn gist_client(server: &StubServer) -> GistClient {
        let config = GithubConfig {
            token: Some("tok".to_string()),
            api_url: server.url().to_string(),
        };
        GistClient::new(Client::new(), &config)
    }

    #[tokio::test]
    async fn test_load_gist() {
        let server = StubServer::bind().await;
        let client = gist_client(&server);
        let requests = server.serve(vec![(
            200,
            json!({"files": {"g1.geojson": {"content": COLLECTION}}}).to_string(),
        )]);

        let mut store = Datastore::default();
        let summary = store.load_gist(&client, "g1").await.unwrap();
        assert_eq!(summary, LoadSummary { loaded: 3, failed: 0 });
        assert!(store.get("mp-1").is_some());
        assert_eq!(requests.await.unwrap()[0].target, "/gists/g1");
    }

    #[tokio::test]
    async fn test_write_gist_sends_collection_as_id_geojson() {
        let server = StubServer::bind().await;
        let client = gist_client(&server);
        let requests = server.serve(vec![(200, "{}".to_string())]);

        let store = loaded_store();
        store.write_gist(&client, "g1").await.unwrap();

        let requests = requests.await.unwrap();
        assert_eq!(requests[0].method, "PATCH");
        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        let content = body["files"]["g1.geojson"]["content"].as_str().unwrap();
        assert_eq!(content, store.to_geojson_string().unwrap());
    }

    #[tokio::test]
    async fn test_infer_altitudes_keeps_going_after_a_failure() {
        let server = StubServer::bind().await;
        let config = ElevationConfig {
            base_url: format!("{}/elevation", server.url()),
            api_key: None,
            request_delay_ms: 0,
        };
        let ok = |elevation: f64| {
            (
                200,
                json!({"status": "OK", "results": [{"elevation": elevation}]}).to_string(),
            )
        };
        // Points are visited in id order: a, b, c. The link is skipped.
        let requests = server.serve(vec![
            ok(10.0),
            (500, r#"{"status": "UNKNOWN_ERROR"}"#.to_string()),
            ok(20.04),
        ]);

        let mut store = Datastore::default();
        for (id, geometry) in [
            ("a", json!({"type": "Point", "coordinates": [-122.1, 37.4]})),
            ("b", json!({"type": "Point", "coordinates": [-122.2, 37.5]})),
            ("c", json!({"type": "Point", "coordinates": [-122.3, 37.6]})),
            (
                "ln",
                json!({"type": "LineString", "coordinates": [[-122.1, 37.4], [-122.2, 37.5]]}),
            ),
        ] {
            let json = json!({
                "type": "Feature", "id": id, "geometry": geometry,
                "properties": {"subtype": "site"}
            });
            store.add(feature(&json.to_string())).unwrap();
        }

        let elevation = ElevationClient::new(Client::new(), &config);
        let summary = store.infer_altitudes(&elevation, 2.0).await;
        assert_eq!(summary, AltitudeSummary { updated: 2, failed: 1 });
        assert_eq!(requests.await.unwrap().len(), 3);

        let altitude = |id: &str| match &store.get(id).unwrap().geometry().value {
            geojson::Value::Point(position) => position.get(2).copied(),
            _ => None,
        };
        assert!((altitude("a").unwrap() - 12.0).abs() < 1e-9);
        assert!(altitude("b").is_none());
        assert!((altitude("c").unwrap() - 22.0).abs() < 1e-9);
    }
}
