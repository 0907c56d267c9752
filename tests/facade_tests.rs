use std::fs;
use std::time::Duration;

use harvest::{FilterPolicy, Predicate, ScanConfig, ScanCoordinator};
use tempfile::TempDir;

#[test]
fn test_batch_consumer_drains_everything() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("src/main/java")).unwrap();
    fs::create_dir_all(root.join("src/main/resources")).unwrap();
    fs::write(root.join("pom.xml"), "<project/>").unwrap();
    fs::write(root.join("README.md"), "# readme").unwrap();
    fs::write(root.join("src/main/java/App.java"), "class App {}").unwrap();
    fs::write(root.join("src/main/resources/beans.xml"), "<beans/>").unwrap();
    fs::write(root.join("src/main/resources/app.properties"), "a=b").unwrap();

    let config = ScanConfig::builder()
        .targets(vec![root.to_path_buf()])
        .extensions(vec!["java".to_string(), "xml".to_string()])
        .policy(FilterPolicy::Any)
        .build()
        .unwrap();

    let coordinator = ScanCoordinator::new();
    coordinator.configure(&config).unwrap();
    assert!(coordinator.contains_filter(&Predicate::extensions(["xml", "java"])));
    assert!(coordinator.contains_filter(&Predicate::extensions(["java", "xml"])));
    coordinator.start().unwrap();

    let interrupter = coordinator.interrupter();
    let mut names = Vec::new();
    while let Some(path) = coordinator.next_found(&interrupter).unwrap() {
        names.push(path.file_name().unwrap().to_string_lossy().into_owned());
    }
    names.sort();

    assert_eq!(names, vec!["App.java", "beans.xml", "pom.xml"]);
    assert!(coordinator.is_finished());
    assert!(coordinator.take_timeout(Duration::from_millis(10)).is_none());
}
