//! Protocol operation markers
//!
//! One zero-sized type per operation, binding its wire name to its typed
//! response payload. Use with [`crate::TaskExecutorExt::call`].

use crate::task::Operation;
use crate::types::*;

macro_rules! operations {
    ($($(#[$meta:meta])* $ty:ident => $name:literal : $resp:ty;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct $ty;

            impl Operation for $ty {
                const NAME: &'static str = $name;
                type Response = $resp;
            }
        )*

        /// Wire names of every operation known to this client.
        pub const ALL_OPERATIONS: &[&str] = &[$($name),*];
    };
}

operations! {
    /// Structured capability introspection.
    GetAdcpCapabilities => "get_adcp_capabilities": GetAdcpCapabilitiesResponse;

    // Media buy protocol
    GetProducts => "get_products": GetProductsResponse;
    ListCreativeFormats => "list_creative_formats": ListCreativeFormatsResponse;
    CreateMediaBuy => "create_media_buy": CreateMediaBuyResponse;
    UpdateMediaBuy => "update_media_buy": UpdateMediaBuyResponse;
    GetMediaBuyDelivery => "get_media_buy_delivery": GetMediaBuyDeliveryResponse;
    SyncCreatives => "sync_creatives": SyncCreativesResponse;
    ListCreatives => "list_creatives": ListCreativesResponse;
    ListAuthorizedProperties => "list_authorized_properties": ListAuthorizedPropertiesResponse;
    ProvidePerformanceFeedback => "provide_performance_feedback": serde_json::Value;

    // Creative protocol
    BuildCreative => "build_creative": BuildCreativeResponse;
    PreviewCreative => "preview_creative": PreviewCreativeResponse;

    // Signals protocol
    GetSignals => "get_signals": GetSignalsResponse;
    ActivateSignal => "activate_signal": ActivateSignalResponse;

    // Governance protocol
    CreatePropertyList => "create_property_list": PropertyListResponse;
    GetPropertyList => "get_property_list": PropertyListResponse;
    UpdatePropertyList => "update_property_list": PropertyListResponse;
    ListPropertyLists => "list_property_lists": ListPropertyListsResponse;
    DeletePropertyList => "delete_property_list": DeletePropertyListResponse;
    ListContentStandards => "list_content_standards": ListContentStandardsResponse;
    GetContentStandards => "get_content_standards": ContentStandardsResponse;
    CreateContentStandards => "create_content_standards": ContentStandardsResponse;
    UpdateContentStandards => "update_content_standards": ContentStandardsResponse;
    CalibrateContent => "calibrate_content": CalibrateContentResponse;
    ValidateContentDelivery => "validate_content_delivery": serde_json::Value;

    // Sponsored intelligence protocol
    SiGetOffering => "si_get_offering": SiGetOfferingResponse;
    SiInitiateSession => "si_initiate_session": SiSessionResponse;
    SiSendMessage => "si_send_message": SiSessionResponse;
    SiTerminateSession => "si_terminate_session": SiTerminateSessionResponse;
}
