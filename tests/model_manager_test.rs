mod common;

use std::fs;

use sentiment_adapter::{
    AdapterConfig, AdapterError, ArtifactError, ArtifactLocation, ExpectedHashes, ModelManager, Preset,
    SentimentAdapter,
};

#[test]
fn test_fetch_local_bundle() -> Result<(), Box<dyn std::error::Error>> {
    let cache = tempfile::tempdir()?;
    let bundle = tempfile::tempdir()?;
    let manager = ModelManager::new(cache.path())?;
    fs::write(bundle.path().join("model.onnx"), b"onnx")?;
    fs::write(bundle.path().join("tokenizer.json"), common::TOKENIZER_JSON)?;

    let location = ArtifactLocation::Local(bundle.path().to_path_buf());
    let paths = tokio_test::block_on(manager.fetch(&location, &ExpectedHashes::default()))?;
    assert!(paths.exist());
    // Local bundles are never deleted by the cache
    manager.remove(&location)?;
    assert!(paths.exist());
    Ok(())
}

#[test]
fn test_local_bundle_resolution() -> Result<(), Box<dyn std::error::Error>> {
    let cache = tempfile::tempdir()?;
    let bundle = tempfile::tempdir()?;
    let manager = ModelManager::new(cache.path())?;

    fs::write(bundle.path().join("model.onnx"), b"not really onnx")?;
    fs::write(bundle.path().join("tokenizer.json"), common::TOKENIZER_JSON)?;

    let uri = format!("file://{}", bundle.path().display());
    let location = ArtifactLocation::parse(&uri)?;
    let paths = manager.resolve(&location)?;
    assert_eq!(paths.tokenizer, bundle.path().join("tokenizer.json"));
    assert!(manager.verify(&location, &ExpectedHashes::default())?);
    Ok(())
}

#[test]
fn test_unsupported_scheme_fails_load() -> Result<(), Box<dyn std::error::Error>> {
    let mut adapter = SentimentAdapter::builder_from_preset(Preset::ThreeClass).build()?;
    let result = adapter.load("gs://bucket/models/sentiment");
    assert!(matches!(
        result,
        Err(AdapterError::Artifact(ArtifactError::UnsupportedScheme(_)))
    ));
    assert!(!adapter.is_loaded());
    Ok(())
}

#[test]
fn test_unfetched_remote_fails_load() -> Result<(), Box<dyn std::error::Error>> {
    let cache = tempfile::tempdir()?;
    let mut adapter = SentimentAdapter::builder_from_preset(Preset::StarRating)
        .with_cache_dir(cache.path())
        .build()?;
    let result = adapter.load("https://models.example.com/star-rating");
    assert!(matches!(result, Err(AdapterError::Artifact(ArtifactError::NotFetched(_)))));
    Ok(())
}

#[test]
fn test_corrupt_model_fails_load() -> Result<(), Box<dyn std::error::Error>> {
    let cache = tempfile::tempdir()?;
    let bundle = tempfile::tempdir()?;
    fs::write(bundle.path().join("model.onnx"), b"corrupted data")?;
    fs::write(bundle.path().join("tokenizer.json"), common::TOKENIZER_JSON)?;

    let mut adapter = SentimentAdapter::builder().with_cache_dir(cache.path()).build()?;
    let result = adapter.load(bundle.path().to_str().expect("utf-8 path"));
    assert!(result.is_err());
    assert!(!adapter.is_loaded());
    Ok(())
}

#[test]
fn test_config_file_drives_builder() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("adapter.json");
    fs::write(
        &path,
        r#"{
            "labels": {"labels": ["1 star", "2 stars", "3 stars", "4 stars", "5 stars"], "field": "review"},
            "padding": "batch_longest",
            "max_length": 128,
            "runtime": {"intra_threads": 2, "optimization_level": "level1"}
        }"#,
    )?;

    let config = AdapterConfig::from_file(&path)?;
    let adapter = SentimentAdapter::builder().with_config(config).build()?;
    let info = adapter.info();
    assert_eq!(info.labels.len(), 5);
    assert_eq!(info.max_length, 128);
    assert_eq!(adapter.config().runtime.intra_threads, 2);
    Ok(())
}

#[test]
fn test_invalid_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("adapter.json");

    fs::write(&path, r#"{"labels": {"labels": []}}"#)?;
    assert!(matches!(AdapterConfig::from_file(&path), Err(AdapterError::Json(_))));

    fs::write(&path, r#"{"max_length": 0}"#)?;
    assert!(matches!(AdapterConfig::from_file(&path), Err(AdapterError::Build(_))));
    Ok(())
}

#[test]
fn test_stale_cache_fails_verification() -> Result<(), Box<dyn std::error::Error>> {
    let cache = tempfile::tempdir()?;
    let manager = ModelManager::new(cache.path())?;
    let location = ArtifactLocation::parse("https://models.example.com/three-class")?;

    // A pre-populated cache entry with the wrong content does not verify
    let dir = manager.cache_dir_for("https://models.example.com/three-class");
    fs::create_dir_all(&dir)?;
    fs::write(dir.join("model.onnx"), b"stale")?;
    fs::write(dir.join("tokenizer.json"), b"{}")?;

    let hashes = ExpectedHashes {
        model: Some("0".repeat(64)),
        tokenizer: None,
    };
    assert!(manager.is_fetched(&location));
    assert!(!manager.verify(&location, &hashes)?);
    Ok(())
}
