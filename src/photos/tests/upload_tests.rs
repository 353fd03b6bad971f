use super::fixtures::{TEST_EVENT, TestServices, jpeg_bytes, png_bytes, test_services, with_exif};
use crate::ThumbnailsConfig;
use crate::photos::decode::decode_image;
use crate::photos::{
    EventId, OverflowPolicy, ThumbnailPersister, ThumbnailPipeline, ThumbnailQueue,
    ThumbnailWorker, UploadError, UploadService, UploadedFile, thumbnail_path, thumbnail_queue,
};
use chrono::NaiveDate;

fn upload_service(
    services: &TestServices,
    config: &ThumbnailsConfig,
) -> (UploadService, ThumbnailQueue, ThumbnailWorker) {
    let persister = ThumbnailPersister::new(
        services.store.clone(),
        services.repository.clone(),
        config.jpeg_quality,
    );
    let pipeline = ThumbnailPipeline::new(config.sizes.clone(), persister);
    let (queue, worker) = thumbnail_queue(config, pipeline);
    let uploads = UploadService::new(
        services.repository.clone(),
        services.store.clone(),
        queue.clone(),
    );
    (uploads, queue, worker)
}

#[tokio::test]
async fn test_upload_rotated_photo_end_to_end() {
    let services = test_services().await;
    let config = ThumbnailsConfig::default();
    let (uploads, queue, worker) = upload_service(&services, &config);
    let handle = worker.spawn();

    let bytes = with_exif(&jpeg_bytes(4000, 3000), Some(6), Some("2020:05:01 10:00:00"));
    let report = uploads
        .ingest(TEST_EVENT, "alice", vec![UploadedFile::new("DCIM/IMG_0001.JPG", bytes)])
        .await
        .unwrap();

    assert_eq!(report.uploaded.len(), 1);
    assert!(report.skipped.is_empty());
    let uploaded = &report.uploaded[0];
    assert_eq!(uploaded.filename, "IMG_0001.JPG");
    assert_eq!(uploaded.url, format!("/photos/{}", uploaded.photo_id));

    let photo = services
        .repository
        .get_photo(uploaded.photo_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!((photo.width, photo.height), (4000, 3000));
    assert_eq!(photo.format, "jpeg");
    assert_eq!(photo.username, "alice");
    assert_eq!(
        photo.taken,
        Some(
            NaiveDate::from_ymd_opt(2020, 5, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        )
    );

    let original = services.memory.object(&photo.storage_path()).await.unwrap();
    assert_eq!(original.content_type, "image/jpeg");

    queue.wait_idle().await;

    let square = services
        .memory
        .object(&thumbnail_path(photo.photo_id, 250, 250))
        .await
        .unwrap();
    assert_eq!(decode_image(&square.bytes).unwrap().dimensions(), (250, 250));

    // Rotated after fitting into 740x555, so the box comes out portrait
    let large = services
        .memory
        .object(&thumbnail_path(photo.photo_id, 740, 555))
        .await
        .unwrap();
    assert_eq!(decode_image(&large.bytes).unwrap().dimensions(), (555, 740));

    let rows = services
        .repository
        .thumbnails_for(photo.photo_id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    queue.shutdown();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_zero_byte_file_is_skipped() {
    let services = test_services().await;
    let (uploads, queue, _worker) = upload_service(&services, &ThumbnailsConfig::default());

    let report = uploads
        .ingest(
            TEST_EVENT,
            "bob",
            vec![
                UploadedFile::new("a.jpg", jpeg_bytes(40, 30)),
                UploadedFile::new("empty.jpg", Vec::new()),
                UploadedFile::new("b.png", png_bytes(20, 20)),
            ],
        )
        .await
        .unwrap();

    let uploaded: Vec<&str> = report.uploaded.iter().map(|u| u.filename.as_str()).collect();
    assert_eq!(uploaded, vec!["a.jpg", "b.png"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].filename, "empty.jpg");
    assert_eq!(queue.pending(), 2);
    assert_eq!(services.repository.count_photos(TEST_EVENT).await.unwrap(), 2);
}

#[tokio::test]
async fn test_corrupt_file_is_skipped_without_side_effects() {
    let services = test_services().await;
    let (uploads, queue, _worker) = upload_service(&services, &ThumbnailsConfig::default());

    let report = uploads
        .ingest(
            TEST_EVENT,
            "carol",
            vec![UploadedFile::new("notes.txt", b"not an image".to_vec())],
        )
        .await
        .unwrap();

    assert!(report.uploaded.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert!(services.memory.paths().await.is_empty());
    assert_eq!(services.repository.count_photos(TEST_EVENT).await.unwrap(), 0);
    assert_eq!(queue.pending(), 0);
}

#[tokio::test]
async fn test_photo_without_exif_is_accepted() {
    let services = test_services().await;
    let (uploads, _queue, _worker) = upload_service(&services, &ThumbnailsConfig::default());

    let report = uploads
        .ingest(TEST_EVENT, "dave", vec![UploadedFile::new("plain.jpg", jpeg_bytes(40, 30))])
        .await
        .unwrap();

    let photo = services
        .repository
        .get_photo(report.uploaded[0].photo_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(photo.taken, None);
}

#[tokio::test]
async fn test_blank_name_is_rejected() {
    let services = test_services().await;
    let (uploads, _queue, _worker) = upload_service(&services, &ThumbnailsConfig::default());

    let result = uploads
        .ingest(TEST_EVENT, "   ", vec![UploadedFile::new("a.jpg", jpeg_bytes(8, 8))])
        .await;

    assert!(matches!(result, Err(UploadError::MissingName)));
    assert!(services.memory.paths().await.is_empty());
}

#[tokio::test]
async fn test_unknown_event_is_rejected() {
    let services = test_services().await;
    let (uploads, _queue, _worker) = upload_service(&services, &ThumbnailsConfig::default());

    let result = uploads
        .ingest(EventId(1), "erin", vec![UploadedFile::new("a.jpg", jpeg_bytes(8, 8))])
        .await;

    assert!(matches!(result, Err(UploadError::EventNotFound(EventId(1)))));
}

#[tokio::test]
async fn test_full_queue_does_not_fail_upload() {
    let services = test_services().await;
    let config = ThumbnailsConfig {
        queue_capacity: 1,
        overflow: OverflowPolicy::Reject,
        ..ThumbnailsConfig::default()
    };
    let (uploads, queue, _worker) = upload_service(&services, &config);

    let report = uploads
        .ingest(
            TEST_EVENT,
            "frank",
            vec![
                UploadedFile::new("1.jpg", jpeg_bytes(8, 8)),
                UploadedFile::new("2.jpg", jpeg_bytes(8, 8)),
            ],
        )
        .await
        .unwrap();

    assert_eq!(report.uploaded.len(), 2);
    assert_eq!(queue.pending(), 1);
}
