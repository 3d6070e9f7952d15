// Publish on one tree, sync another from it

use packsync::{ManifestGenerator, ResourceSet};

use super::support::{default_config, resource_url, MemoryDownloader, Pack};

/// Generate a manifest for `server`, give every file a URL and publish it.
async fn publish_tree(server: &Pack, downloader: &MemoryDownloader) -> ResourceSet {
    let previous = ResourceSet::load(&server.manifest_path).unwrap_or_else(|_| ResourceSet::new("pack"));
    let mut manifest = ManifestGenerator::new(
        &server.base,
        default_config(),
        previous,
        &server.manifest_path,
    )
    .generate()
    .await
    .unwrap()
    .manifest;

    for resource in manifest.resources.iter_mut() {
        resource.url = resource_url(&resource.path);
        downloader.serve(&resource.url, server.read(&resource.path).into_bytes());
    }
    manifest.refresh_hash();
    manifest.save(&server.manifest_path).unwrap();
    downloader.serve_manifest(&manifest);
    manifest
}

#[tokio::test]
async fn test_client_matches_server_after_sync() {
    let server = Pack::new();
    server.write("mods/a.jar", "alpha");
    server.write("mods/b.jar", "beta");
    server.write("config/x/settings.toml", "gamma");
    let downloader = MemoryDownloader::new();
    let published = publish_tree(&server, &downloader).await;

    let client = Pack::new();
    client.sequencer(downloader.clone()).run().await.unwrap();

    for resource in &published.resources {
        assert_eq!(client.read(&resource.path), server.read(&resource.path));
    }

    // the client tree now hashes to the same set
    let regenerated = ManifestGenerator::new(
        &client.base,
        default_config(),
        ResourceSet::new("pack"),
        client.base.join("local.json"),
    )
    .generate()
    .await
    .unwrap()
    .manifest;
    assert_eq!(regenerated.resources.len(), published.resources.len());
    for resource in &published.resources {
        assert_eq!(
            regenerated.get(&resource.path).map(|r| r.hash.as_str()),
            Some(resource.hash.as_str())
        );
    }
}

#[tokio::test]
async fn test_retired_file_reaches_client_as_patch() {
    let server = Pack::new();
    server.write("mods/a.jar", "alpha");
    server.write("mods/b.jar", "beta");
    let downloader = MemoryDownloader::new();
    publish_tree(&server, &downloader).await;

    let client = Pack::new();
    client.sequencer(downloader.clone()).run().await.unwrap();
    assert!(client.exists("mods/b.jar"));

    std::fs::remove_file(server.path("mods/b.jar")).unwrap();
    let v2 = publish_tree(&server, &downloader).await;
    assert_eq!(v2.patches, vec!["mods/b.jar"]);

    let report = client.sequencer(downloader.clone()).run().await.unwrap();
    assert_eq!(report.patches_removed, vec!["mods/b.jar"]);
    assert!(!client.exists("mods/b.jar"));
    assert!(client.exists("mods/a.jar"));
    assert!(client.config().preserve.is_empty());
}
