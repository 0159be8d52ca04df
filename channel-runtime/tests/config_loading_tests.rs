/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
use std::fs;
use std::time::Duration;

use channel_runtime::prelude::*;
use tempfile::TempDir;

use crate::setup::*;

mod setup;

/// Missing files fall back to defaults
#[test]
fn missing_file_uses_defaults() {
    initialize_tracing();
    let temp_dir = TempDir::new().unwrap();

    let config = RuntimeConfig::load_from(&temp_dir.path().join("config.toml"));

    assert_eq!(config, RuntimeConfig::default());
}

/// Values present in the file override the defaults, the rest keep them
#[test]
fn custom_values_override_defaults() {
    initialize_tracing();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        r"
        [timeouts]
        reply_timeout_ms = 1500

        [limits]
        subscription_buffer = 256

        [behavior]
        log_envelopes = false
        ",
    )
    .unwrap();

    let config = RuntimeConfig::load_from(&path);

    assert_eq!(config.reply_timeout(), Some(Duration::from_millis(1500)));
    assert_eq!(config.close_timeout(), Duration::from_secs(5));
    assert_eq!(config.limits.subscription_buffer, 256);
    assert!(!config.behavior.log_envelopes);
}

/// Malformed files are logged and ignored
#[test]
fn malformed_file_uses_defaults() {
    initialize_tracing();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
        [timeouts]
        reply_timeout_ms = "soon"
        "#,
    )
    .unwrap();

    assert_eq!(RuntimeConfig::load_from(&path), RuntimeConfig::default());
}

/// The XDG lookup finds `channel-runtime/config.toml` under `XDG_CONFIG_HOME`
#[test]
fn xdg_directory_resolution() {
    initialize_tracing();
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join("channel-runtime");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        r"
        [timeouts]
        close_timeout_ms = 7500
        ",
    )
    .unwrap();
    std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());

    let config = RuntimeConfig::load();

    assert_eq!(config.close_timeout(), Duration::from_millis(7500));
    temp_dir.close().unwrap();
}

/// Disabling envelope logging keeps contexts free of the rendered envelope
#[tokio::test]
async fn envelope_logging_can_be_disabled() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = MemoryBroker::with_capacity(4);
    let config = RuntimeConfig::from_toml_str(
        r"
        [behavior]
        log_envelopes = false
        ",
    )?;
    let controller = controller_builder(&broker).config(config).build()?;
    let rendered = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let recorded = rendered.clone();
    controller
        .subscribe_to_channel("ping", move |ctx: MessageContext, _ping: setup::messages::Ping| {
            recorded.lock().push(ctx.envelope().map(str::to_owned));
            async { anyhow::Ok(()) }
        })
        .await?;

    controller
        .send_to_channel("ping", &setup::messages::Ping::new("quiet"))
        .await?;
    eventually(|| rendered.lock().len() == 1).await;

    assert_eq!(rendered.lock()[0], None);
    controller.close().await?;
    Ok(())
}
