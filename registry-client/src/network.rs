use crate::conf::ServerAddr;
use anyhow::bail;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::LazyLock;
use std::time::Duration;

/// Thin HTTP wrapper. Adapted from `client/src/network/mod.rs::Network`; the
/// server here returns real status codes and a bare JSON body rather than
/// the teacher's uniform `Res<T>{code,msg,data}` envelope, so callers parse
/// whatever shape each endpoint returns and a non-2xx status carries the
/// `{error}` body.
pub struct Network {
    client: reqwest::Client,
}

pub static HTTP: LazyLock<Network> = LazyLock::new(|| {
    let client = reqwest::ClientBuilder::default()
        .connect_timeout(Duration::from_secs(1))
        .timeout(Duration::from_secs(10))
        .build()
        .expect("reqwest client builds with static config");
    Network { client }
});

impl Network {
    pub async fn get<T: DeserializeOwned + Debug>(&self, url: &str) -> anyhow::Result<T> {
        log::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }

    pub async fn post<T: DeserializeOwned + Debug>(
        &self,
        url: &str,
        body: impl Serialize + Debug,
    ) -> anyhow::Result<T> {
        log::debug!("POST {}, body: {:?}", url, body);
        let response = self.client.post(url).json(&body).send().await?;
        Self::decode(response).await
    }

    pub async fn put(&self, url: &str) -> anyhow::Result<StatusCode> {
        log::debug!("PUT {}", url);
        let response = self.client.put(url).send().await?;
        Ok(response.status())
    }

    async fn decode<T: DeserializeOwned + Debug>(
        response: reqwest::Response,
    ) -> anyhow::Result<T> {
        let status = response.status();
        if status != StatusCode::OK {
            bail!("http {}: {}", status, response.text().await?);
        }
        Ok(response.json::<T>().await?)
    }
}

impl ServerAddr {
    pub fn build_url(&self, path: &str) -> anyhow::Result<String> {
        match self {
            ServerAddr::Single(address) => Ok(format!("http://{}{}", address, path)),
            ServerAddr::Cluster(addresses) => {
                let address = &addresses[fastrand::usize(..addresses.len())];
                Ok(format!("http://{}{}", address, path))
            }
            ServerAddr::Unset => bail!("registry server address not set"),
        }
    }
}
