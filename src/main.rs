use std::collections::HashMap;
use std::io::Cursor;

use anyhow::{bail, Context};
use blocksync::sync::{
    BlockChecksum, BlockOperation, CancellationToken, ChecksumGenerator, MemoryCache,
    Reconstructor, StrongHasher, SyncConfig,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing_subscriber::EnvFilter;

/// Aligned-block matcher used only by this demo: each block of `new` either
/// reuses an identical block of `old` or is sent as a literal.
async fn match_blocks(
    index: &HashMap<u32, Vec<BlockChecksum>>,
    config: &SyncConfig,
    new: &[u8],
    tx: mpsc::Sender<BlockOperation>,
) {
    let mut hasher = config.strong_hash.hasher();

    for (position, block) in new.chunks(config.block_size).enumerate() {
        let reused = index
            .get(&blocksync::sync::weak_checksum(block))
            .and_then(|candidates| {
                candidates
                    .iter()
                    .find(|c| c.matches(block, config.strong_mode, hasher.as_mut()))
            })
            .map(|c| BlockOperation::reuse(c.index));

        let op = reused
            .unwrap_or_else(|| BlockOperation::literal(position as u64, block.to_vec()));

        if tx.send(op).await.is_err() {
            return;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let (old, new) = match args.as_slice() {
        [_] => (
            b"The quick brown fox jumps over the lazy dog. ".repeat(64),
            b"The quick brown cat jumps over the lazy dog. ".repeat(64),
        ),
        [_, old, new] => (
            tokio::fs::read(old)
                .await
                .with_context(|| format!("reading {}", old))?,
            tokio::fs::read(new)
                .await
                .with_context(|| format!("reading {}", new))?,
        ),
        _ => bail!("usage: blocksync-demo [OLD NEW]"),
    };

    let config = SyncConfig::with_block_size(64);
    let cancel = CancellationToken::new();

    println!("blocksync - block checksum + reconstruction demo");
    println!("==================================================\n");

    let mut stream = ChecksumGenerator::new(&config)?.generate(Cursor::new(old.clone()), cancel.clone());
    let mut index: HashMap<u32, Vec<BlockChecksum>> = HashMap::new();
    let mut blocks = 0;
    while let Some(checksum) = stream.recv().await {
        if let Some(err) = checksum.error {
            bail!("checksum generation failed: {}", err);
        }
        blocks += 1;
        index.entry(checksum.weak).or_default().push(checksum);
    }
    println!("✓ Indexed {} blocks of {} bytes", blocks, config.block_size);

    let (tx, rx) = mpsc::channel(1);
    let matcher = {
        let config = config.clone();
        let new = new.clone();
        tokio::spawn(async move { match_blocks(&index, &config, &new, tx).await })
    };

    let cache = MemoryCache::new(old);
    let mut output = Vec::with_capacity(new.len());
    let stats = Reconstructor::new(&config)?
        .apply(&mut output, &cache, ReceiverStream::new(rx), &cancel)
        .await?;
    matcher.await?;

    if output != new {
        bail!("reconstructed output differs from target");
    }

    println!("✓ {}", stats);
    let digest = blocksync::sync::Blake3Strong::new().digest(&output);
    println!("✓ Output verified, strong digest {:02x?}", digest);

    Ok(())
}
