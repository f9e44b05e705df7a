use tonic_build::manual::{Builder, Method, Service};

fn method(name: &str, route: &str, input: &str, output: &str) -> tonic_build::manual::MethodBuilder {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::rpc::proto::{input}"))
        .output_type(format!("crate::rpc::proto::{output}"))
        .codec_path("tonic::codec::ProstCodec")
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let file_service = Service::builder()
        .name("FileService")
        .package("image_service")
        .method(method("upload_file", "UploadFile", "UploadFileRequest", "UploadFileResponse").build())
        .method(method("list_files", "ListFiles", "ListFilesRequest", "ListFilesResponse").build())
        .method(
            method(
                "download_file",
                "DownloadFile",
                "DownloadFileRequest",
                "DownloadFileResponse",
            )
            .server_streaming()
            .build(),
        )
        .method(method("health_check", "HealthCheck", "HealthCheckRequest", "HealthCheckResponse").build())
        .build();

    Builder::new()
        .build_server(true)
        .build_client(true)
        .compile(&[file_service]);
}
