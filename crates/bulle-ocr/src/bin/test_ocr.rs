//! Capture the primary screen once and print detected blocks:
//! cargo run -p bulle-ocr --bin test_ocr -- [language]

use anyhow::Result;

#[cfg(windows)]
#[tokio::main]
async fn main() -> Result<()> {
    use bulle_ocr::{FrameSource, ScreenFrameSource, TextDetector, WinOcrDetector};

    let language = std::env::args().nth(1).unwrap_or_else(|| "en".to_string());

    let source = ScreenFrameSource::primary()?;
    let detector = WinOcrDetector::new(&language)?;

    let start = std::time::Instant::now();
    let Some(frame) = source.acquire()? else {
        anyhow::bail!("no frame available");
    };
    println!("captured {}x{} in {:?}", frame.width(), frame.height(), start.elapsed());

    let start = std::time::Instant::now();
    let blocks = detector.detect(frame).await?;
    println!("{} blocks in {:?}", blocks.len(), start.elapsed());

    for block in blocks.iter().take(20) {
        println!("{:?} {}", block.bounds, block.text);
    }
    Ok(())
}

#[cfg(not(windows))]
fn main() -> Result<()> {
    anyhow::bail!("screen capture and OCR backends are only available on Windows")
}
