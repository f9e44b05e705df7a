//! Shared Admission Tests
//!
//! Both front-ends run against one controller and one upload directory.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use image_service::admission::{AdmissionController, OperationClass};
use image_service::file::{ContentValidator, FileStore, TransferService};
use image_service::rpc::proto::{DownloadFileRequest, UploadFileRequest};
use image_service::rpc::{FileServiceClient, RpcServer};
use image_service::web::WebServer;
use serde_json::Value;
use tempfile::TempDir;
use tonic::Code;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

fn png(len: usize) -> Vec<u8> {
    let mut data = PNG_MAGIC.to_vec();
    data.extend((0..len.saturating_sub(PNG_MAGIC.len())).map(|i| (i % 251) as u8));
    data
}

struct Servers {
    http: SocketAddr,
    grpc: SocketAddr,
    service: Arc<TransferService>,
    admission: Arc<AdmissionController>,
    _temp_dir: TempDir,
}

async fn start_servers(transfer_permits: usize) -> Servers {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::new(temp_dir.path()).unwrap();
    let validator = ContentValidator::new(["image/png"]);
    let service = Arc::new(TransferService::new(store, validator));
    let admission = Arc::new(AdmissionController::new(transfer_permits, 100));

    let any_port: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let http = WebServer::new(any_port, service.clone(), admission.clone())
        .run_with_addr()
        .await
        .unwrap();
    let grpc = RpcServer::new(any_port, service.clone(), admission.clone())
        .run_with_addr()
        .await
        .unwrap();

    Servers {
        http,
        grpc,
        service,
        admission,
        _temp_dir: temp_dir,
    }
}

fn multipart_png(name: &str, content: Vec<u8>) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(content).file_name(name.to_string());
    reqwest::multipart::Form::new().part("file", part)
}

#[tokio::test]
async fn test_http_upload_visible_over_grpc() {
    let servers = start_servers(10).await;
    let content = png(100 * 1024);

    let response = reqwest::Client::new()
        .post(format!("http://{}/upload", servers.http))
        .multipart(multipart_png("shared.png", content.clone()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let filename = body["data"]["filename"].as_str().unwrap().to_string();

    let mut client = FileServiceClient::connect(format!("http://{}", servers.grpc))
        .await
        .unwrap();
    let mut stream = client
        .download_file(DownloadFileRequest { filename })
        .await
        .unwrap()
        .into_inner();

    let mut downloaded = Vec::new();
    while let Some(message) = stream.message().await.unwrap() {
        downloaded.extend_from_slice(&message.chunk);
    }
    assert_eq!(downloaded, content);
}

#[tokio::test]
async fn test_grpc_stream_blocks_http_upload() {
    let servers = start_servers(1).await;

    let uploaded = servers
        .service
        .upload_bytes(Bytes::from(png(8 * 1024 * 1024)), "big.png".to_string())
        .await
        .unwrap();

    let mut client = FileServiceClient::connect(format!("http://{}", servers.grpc))
        .await
        .unwrap();
    let mut stream = client
        .download_file(DownloadFileRequest {
            filename: uploaded.filename,
        })
        .await
        .unwrap()
        .into_inner();
    stream.message().await.unwrap().unwrap();
    assert_eq!(servers.admission.in_use(OperationClass::Transfer), 1);

    let response = reqwest::Client::new()
        .post(format!("http://{}/upload", servers.http))
        .multipart(multipart_png("blocked.png", png(100)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Too many upload requests");

    drop(stream);
    for _ in 0..400 {
        if servers.admission.in_use(OperationClass::Transfer) == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(servers.admission.in_use(OperationClass::Transfer), 0);

    let status = client
        .upload_file(UploadFileRequest {
            filename: "after.png".to_string(),
            content: Bytes::from(png(100)),
        })
        .await
        .map(|_| Code::Ok)
        .unwrap_or_else(|s| s.code());
    assert_eq!(status, Code::Ok);
}
