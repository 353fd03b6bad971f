use super::fixtures::{FailingStore, gradient_image, insert_photo, test_services};
use crate::photos::decode::decode_image;
use crate::photos::persist::THUMBNAIL_CONTENT_TYPE;
use crate::photos::{PhotoId, ProcessingError, Thumbnail, ThumbnailPersister};
use crate::storage::Visibility;
use std::sync::Arc;

#[tokio::test]
async fn test_persist_stores_and_records() {
    let services = test_services().await;
    insert_photo(&services.repository, 7).await;
    let persister = ThumbnailPersister::new(services.store.clone(), services.repository.clone(), 85);

    let thumbnail = persister
        .persist(gradient_image(250, 250), PhotoId(7), 250, 250)
        .await
        .unwrap();
    assert_eq!(thumbnail, Thumbnail::new(PhotoId(7), 250, 250));

    let object = services.memory.object("250x250/7").await.unwrap();
    assert_eq!(object.content_type, THUMBNAIL_CONTENT_TYPE);
    assert_eq!(object.visibility, Visibility::PublicRead);

    let decoded = decode_image(&object.bytes).unwrap();
    assert_eq!(decoded.format, "jpeg");
    assert_eq!(decoded.dimensions(), (250, 250));

    let rows = services.repository.thumbnails_for(PhotoId(7)).await.unwrap();
    assert_eq!(rows, vec![thumbnail]);
}

#[tokio::test]
async fn test_persist_twice_keeps_one_row() {
    let services = test_services().await;
    insert_photo(&services.repository, 8).await;
    let persister = ThumbnailPersister::new(services.store.clone(), services.repository.clone(), 85);

    for _ in 0..2 {
        persister
            .persist(gradient_image(50, 50), PhotoId(8), 50, 50)
            .await
            .unwrap();
    }

    let rows = services.repository.thumbnails_for(PhotoId(8)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(services.memory.put_log().await, vec!["50x50/8", "50x50/8"]);
}

#[tokio::test]
async fn test_store_failure_writes_no_row() {
    let services = test_services().await;
    insert_photo(&services.repository, 9).await;
    let persister = ThumbnailPersister::new(Arc::new(FailingStore), services.repository.clone(), 85);

    let result = persister
        .persist(gradient_image(50, 50), PhotoId(9), 250, 250)
        .await;

    match result {
        Err(ProcessingError::StoreWrite { path, .. }) => assert_eq!(path, "250x250/9"),
        other => panic!("expected StoreWrite, got {:?}", other),
    }
    assert!(services.repository.thumbnails_for(PhotoId(9)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_row_failure_removes_stored_object() {
    let services = test_services().await;
    // No photo row, so the thumbnail row violates its foreign key
    let persister = ThumbnailPersister::new(services.store.clone(), services.repository.clone(), 85);

    let result = persister
        .persist(gradient_image(50, 50), PhotoId(404), 250, 250)
        .await;

    assert!(matches!(result, Err(ProcessingError::MetadataInsert { .. })));
    assert!(!services.memory.contains("250x250/404").await);
    assert_eq!(services.memory.put_log().await, vec!["250x250/404"]);
}

#[test]
fn test_encode_drops_alpha() {
    let image = image::DynamicImage::new_rgba8(10, 10);
    let bytes = crate::photos::persist::encode_jpeg(&image, 85).unwrap();

    let decoded = decode_image(&bytes).unwrap();
    assert_eq!(decoded.dimensions(), (10, 10));
}
