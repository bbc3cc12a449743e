//! Azure OpenAI adaptor: deployment-path URLs and `api-key` authentication.

use crate::{dispatch::Adaptor, headers, url};
use async_trait::async_trait;
use chanrelay_types::{ChannelType, RelayInfo, traits::Result};
use http::HeaderMap;

pub struct AzureAdaptor;

#[async_trait]
impl Adaptor for AzureAdaptor {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Azure
    }

    fn get_request_url(&self, info: &RelayInfo) -> Result<String> {
        let path = url::azure_deployment_path(
            &info.request_url_path,
            &info.api_version,
            &info.upstream_model_name,
        );
        Ok(url::full_request_url(&info.base_url, &path, ChannelType::Azure))
    }

    async fn setup_request_header(&self, headers: &mut HeaderMap, info: &RelayInfo) -> Result<()> {
        headers::set_secret(headers, headers::API_KEY, info.api_key())
    }
}
