pub mod session;
pub mod toast;

pub use session::{
    ChatBus, SessionProvider, SignedIn, UiContext, use_app_context,
    use_chat_bus, use_signed_in,
};
pub use toast::{ToastContext, ToastProvider, use_toast};
