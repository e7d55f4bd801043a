//! Integration tests for the `wgan` binary.
//!
//! Runs the compiled CLI against synthetic IDX data in a temp directory with
//! narrow networks, so no MNIST download is needed.

use std::path::Path;
use std::process::{Command, Output};

use mnist::{IdxWriter, Images, MnistDataset, TEST_IMAGES_FILE};

const TINY_CONFIG: &str = r#"
[training]
batch_size = 4
discriminator_iterations = 2
log_interval = 1

[generator]
latent_dim = 8
seed_channels = 2
stage_channels = [4, 4, 2]

[discriminator]
channels = [2, 2, 2, 2, 2]
"#;

fn wgan(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wgan"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch wgan binary")
}

fn synthetic_images(count: usize) -> Images {
    let pixels = (0..count * 784).map(|i| ((i * 7) % 256) as u8).collect();
    Images::new(count, 28, 28, pixels).unwrap()
}

fn write_mnist_dir(dir: &Path, count: usize) {
    let dataset = MnistDataset {
        train: synthetic_images(count),
        test: synthetic_images(1),
    };
    IdxWriter::write_dataset(dir, &dataset).unwrap();
}

#[test]
fn test_describe_default_networks() {
    let output = wgan(&["describe"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Generator"));
    assert!(stdout.contains("Discriminator"));
    assert!(stdout.contains("(1, 28, 28)"), "generator output shape missing:\n{stdout}");
    assert!(stdout.contains("(256, 4, 4)"), "last critic stage shape missing:\n{stdout}");
}

#[test]
fn test_train_writes_reports() {
    let tmp = tempfile::TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    let out_dir = tmp.path().join("images2");
    let config_path = tmp.path().join("tiny.toml");
    write_mnist_dir(&data_dir, 6);
    std::fs::write(&config_path, TINY_CONFIG).unwrap();

    let output = wgan(&[
        "train",
        "--config",
        config_path.to_str().unwrap(),
        "--data-dir",
        data_dir.to_str().unwrap(),
        "--output-dir",
        out_dir.to_str().unwrap(),
        "--epochs",
        "4",
        "--save-interval",
        "2",
        "--seed",
        "5",
        "--no-progress",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    for name in ["mnist_0.png", "mnist_2.png", "mnist_4.png", "losses.json", "losses.svg", "config.json"] {
        assert!(out_dir.join(name).is_file(), "missing {name}");
    }
    assert!(!out_dir.join("mnist_1.png").exists());

    let losses: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out_dir.join("losses.json")).unwrap()).unwrap();
    assert_eq!(losses["critic"].as_array().unwrap().len(), 4);
    assert_eq!(losses["generator"].as_array().unwrap().len(), 4);

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out_dir.join("config.json")).unwrap()).unwrap();
    assert_eq!(saved["epochs"], 4);
    assert_eq!(saved["batch_size"], 4);
    assert_eq!(saved["generator"]["latent_dim"], 8);
}

#[test]
fn test_train_missing_data_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let output = wgan(&[
        "train",
        "--data-dir",
        tmp.path().join("nowhere").to_str().unwrap(),
        "--output-dir",
        tmp.path().join("out").to_str().unwrap(),
        "--no-progress",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load MNIST images"), "stderr: {stderr}");
}

#[test]
fn test_train_requires_test_split() {
    let tmp = tempfile::TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    write_mnist_dir(&data_dir, 2);
    std::fs::remove_file(data_dir.join(TEST_IMAGES_FILE)).unwrap();

    let output = wgan(&[
        "train",
        "--data-dir",
        data_dir.to_str().unwrap(),
        "--output-dir",
        tmp.path().join("out").to_str().unwrap(),
        "--no-progress",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load MNIST images"), "stderr: {stderr}");
}

#[test]
fn test_train_rejects_invalid_config() {
    let tmp = tempfile::TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    write_mnist_dir(&data_dir, 2);

    let output = wgan(&[
        "train",
        "--data-dir",
        data_dir.to_str().unwrap(),
        "--output-dir",
        tmp.path().join("out").to_str().unwrap(),
        "--batch-size",
        "0",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("batch_size"), "stderr: {stderr}");
}
