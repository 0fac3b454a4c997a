use registry_client::conf::{AgentConfigBuilder, ServerAddr};
use registry_client::{Conreg, utils};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AgentConfigBuilder::default()
        .server_addr(ServerAddr::Single("127.0.0.1:8000".to_string()))
        .name("test-server")
        .id("1")
        .hostname(utils::current_hostname())
        .ip("127.0.0.1")
        .port(8080u16)
        .build()?;

    let conreg = Conreg::start(config).await?;

    loop {
        match conreg.pick("test-server").await {
            Ok(instance) => println!("picked instance: {:?}", instance),
            Err(e) => println!("no instance available: {}", e),
        }
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }
}
