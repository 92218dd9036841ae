//! Generate an image and write it to disk, then edit it.
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! RUST_LOG=openai_images=debug cargo run -p openai-images --example generate_image
//! ```

#![allow(clippy::print_stdout)]

use openai_images::{ImageClient, ImageModel, ImageSize};
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "A watercolor painting of a lighthouse on a rocky coast at dusk";

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = ImageClient::from_env()?;

    let images = client
        .generate_image(PROMPT, ImageModel::GptImage1, ImageSize::Square, 1)
        .await?;

    for (i, image) in images.iter().enumerate() {
        let path = format!("lighthouse-{i}.png");
        std::fs::write(&path, image.data())?;
        println!("wrote {path} ({} bytes)", image.len());
    }

    // Feed the first result back into the edit endpoint
    let Some(first) = images.into_iter().next() else {
        return Ok(());
    };
    let edited = client
        .edit_images(
            [first.into_bytes()],
            "Add a full moon above the lighthouse",
            ImageModel::GptImage1,
            ImageSize::Square,
            1,
        )
        .await?;

    for (i, image) in edited.iter().enumerate() {
        let path = format!("lighthouse-edited-{i}.png");
        std::fs::write(&path, image.data())?;
        println!("wrote {path} ({} bytes)", image.len());
    }

    Ok(())
}
