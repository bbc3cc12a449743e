//! Custom channel: the base URL is a full endpoint template.

use crate::{dispatch::Adaptor, url};
use chanrelay_types::{ChannelType, RelayInfo, traits::Result};

pub struct CustomAdaptor;

impl Adaptor for CustomAdaptor {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Custom
    }

    /// The request path is ignored; `{model}` placeholders are filled in.
    fn get_request_url(&self, info: &RelayInfo) -> Result<String> {
        Ok(url::fill_model_template(
            &info.base_url,
            &info.upstream_model_name,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(base: &str, model: &str) -> RelayInfo {
        RelayInfo::builder()
            .channel_type(ChannelType::Custom)
            .api_key("k")
            .base_url(base)
            .upstream_model_name(model)
            .build()
    }

    #[test]
    fn test_template_filled() {
        let url = CustomAdaptor
            .get_request_url(&info("https://x.example/{model}/chat", "m1"))
            .unwrap();
        assert_eq!(url, "https://x.example/m1/chat");
        assert!(!url.contains("{model}"));
    }

    #[test]
    fn test_model_inserted_verbatim() {
        let url = CustomAdaptor
            .get_request_url(&info("https://x.example/{model}", "gpt-4.1"))
            .unwrap();
        assert_eq!(url, "https://x.example/gpt-4.1");
    }

    #[test]
    fn test_without_placeholder() {
        let url = CustomAdaptor
            .get_request_url(&info("https://x.example/v1/chat/completions", "m"))
            .unwrap();
        assert_eq!(url, "https://x.example/v1/chat/completions");
    }
}
