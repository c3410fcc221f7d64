use anyhow::Result;
use colorindex::IndexBuilder;
use colorindex::cache::{ClearTarget, Namespace};
use colorindex::color::{Hsl, rgb_to_hex};
use colorindex::index::{IndexError, MatchPolicy, Spectrum};
use colorindex::media::MediaRecord;
use colorindex::store::{KeyValueStore, MemoryStore};
use rstest::*;
use tokio_util::sync::CancellationToken;

#[fixture]
fn media() -> Vec<MediaRecord> {
    vec![
        MediaRecord::new("/photos/red.webp").with_hsl(Hsl::new(0., 1., 0.5)),
        MediaRecord::new("/photos/green.webp").with_hsl(Hsl::new(1. / 3., 1., 0.5)),
        MediaRecord::new("/photos/blue.webp").with_hsl(Hsl::new(2. / 3., 1., 0.5)),
        MediaRecord::new("/photos/gray.webp").with_hsl(Hsl::new(0., 0., 0.5)),
        MediaRecord::new("/photos/black.webp").with_hsl(Hsl::new(0., 0., 0.05)),
        MediaRecord::new("/photos/plain.webp"),
    ]
}

/// 红色为 `red` 的所有颜色键
fn plane(red: u8) -> Vec<String> {
    (0..=u8::MAX).flat_map(|green| (0..=u8::MAX).map(move |blue| rgb_to_hex(red, green, blue))).collect()
}

async fn snapshot(store: &MemoryStore, red: u8) -> Result<Vec<Option<String>>> {
    let keys = plane(red).into_iter().map(|key| format!("color:{key}")).collect::<Vec<_>>();
    Ok(store.get_many(&keys).await?)
}

#[rstest]
#[case::weighted(MatchPolicy::Weighted)]
#[case::prioritized(MatchPolicy::Prioritized)]
#[tokio::test(flavor = "multi_thread")]
async fn build_is_deterministic(media: Vec<MediaRecord>, #[case] policy: MatchPolicy) -> Result<()> {
    let spectrum = Spectrum::new(256, 64)?;

    let first = MemoryStore::new();
    let index = IndexBuilder::new(first.clone()).policy(policy).open().await?;
    index.build_spectrums(media.clone(), vec![spectrum]).await?;

    // 照片顺序不影响结果
    let second = MemoryStore::new();
    let mut reversed = media;
    reversed.reverse();
    let index = IndexBuilder::new(second.clone()).policy(policy).open().await?;
    index.build_spectrums(reversed, vec![spectrum]).await?;

    let first = snapshot(&first, 64).await?;
    assert!(first.iter().all(Option::is_some));
    assert_eq!(first, snapshot(&second, 64).await?);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn interrupted_build_resumes(media: Vec<MediaRecord>) -> Result<()> {
    let spectrum = Spectrum::new(256, 200)?;
    let store = MemoryStore::new();
    let index = IndexBuilder::new(store.clone()).open().await?;

    let summary = index.build_spectrums(media.clone(), vec![spectrum]).await?;
    assert_eq!((summary.written, summary.skipped), (65536, 0));
    let complete = snapshot(&store, 200).await?;

    // 模拟中断：丢掉后一半的结果
    let lost = plane(200).into_iter().skip(30000).map(|key| format!("color:{key}")).collect::<Vec<_>>();
    assert_eq!(store.delete_many(&lost).await?, 35536);

    let summary = index.build_spectrums(media, vec![spectrum]).await?;
    assert_eq!((summary.written, summary.skipped), (35536, 30000));
    assert_eq!(snapshot(&store, 200).await?, complete);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn build_several_spectrums(media: Vec<MediaRecord>) -> Result<()> {
    let store = MemoryStore::new();
    let index = IndexBuilder::new(store.clone()).open().await?;
    let spectrums = vec![Spectrum::new(256, 1)?, Spectrum::new(256, 255)?];

    let summary = index.build_spectrums(media, spectrums).await?;
    assert_eq!(summary.workers, 2);
    assert_eq!(summary.written, 131072);
    assert_eq!(store.len(), 131072);

    assert_eq!(index.lookup("ff0000").await?.as_deref(), Some("/photos/red.webp"));
    assert_eq!(index.lookup("#FFFFFF").await?.as_deref(), Some("/photos/gray.webp"));
    assert_eq!(index.lookup("#0000ff").await?, None);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelled_build(media: Vec<MediaRecord>) -> Result<()> {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let store = MemoryStore::new();
    let index = IndexBuilder::new(store.clone()).threads(4).cancel_token(cancel).open().await?;

    let err = index.build_index(media).await.unwrap_err();
    assert!(matches!(err, IndexError::Cancelled));
    assert!(store.is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn build_without_colored_media() -> Result<()> {
    let index = IndexBuilder::new(MemoryStore::new()).open().await?;
    let err = index.build_index(vec![MediaRecord::new("/photos/plain.webp")]).await.unwrap_err();
    assert!(matches!(err, IndexError::NoCandidates));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stats_and_clear_after_build(media: Vec<MediaRecord>) -> Result<()> {
    let store = MemoryStore::new();
    let index = IndexBuilder::new(store.clone()).open().await?;
    for record in &media {
        index.cache().put_media(record.file_name(), record).await?;
    }
    index.build_spectrums(media.clone(), vec![Spectrum::new(256, 0)?]).await?;

    let stats = index.cache().stats().await?;
    assert_eq!((stats.color, stats.media, stats.total), (65536, 6, 65542));

    let slice = index.cache().slice(Namespace::Media, 0, 4).await?;
    assert_eq!(slice.len(), 4);
    assert!(slice.iter().all(|entry| entry.key.starts_with("media:")));

    let outcome = index.cache().clear(ClearTarget::Color).await?;
    assert_eq!(outcome.entries_cleared, Some(65536));
    let stats = index.cache().stats().await?;
    assert_eq!((stats.color, stats.media), (0, 6));
    assert_eq!(index.cache().get_media("gray").await?.map(|m| m.uri), Some("/photos/gray.webp".to_string()));

    index.cache().clear(ClearTarget::All).await?;
    assert!(store.is_empty());
    Ok(())
}
