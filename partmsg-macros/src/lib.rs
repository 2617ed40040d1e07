//! Procedural macros for partmsg.

use proc_macro::TokenStream;

mod message;

/// Derive the `Message` trait.
///
/// Declaration details go in an optional `#[message(...)]` attribute:
///
/// - `args = (T1, T2, ..)`: positional parameters (default `()`)
/// - `parent = Path`: the parent message; its parameters must be a prefix
/// - `name = "..."`: the unique message name (default: the type path)
/// - `abstract`: a grouping message that is not meant to be sent
/// - `collect`: submit the message for `preload_collected` (feature `inventory`)
///
/// ```rust,ignore
/// #[derive(Message)]
/// #[message(args = (u32, String), parent = Input, name = "touch")]
/// struct Touch;
/// ```
#[proc_macro_derive(Message, attributes(message))]
pub fn derive_message(input: TokenStream) -> TokenStream {
    message::derive_message_impl(input)
}
