extern crate proc_macro;

use quote::quote;

use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{Attribute, Expr, FnArg, ItemTrait, Meta, NestedMeta, Pat, TraitItem};

use crate::proc_macro::TokenStream;

/// Associates a function with a native stack event variant.
#[proc_macro_attribute]
pub fn btif_callback(_attr: TokenStream, item: TokenStream) -> TokenStream {
    item
}

/// Returns the event variant named by a `#[btif_callback(Variant)]` attribute, if any.
fn find_btif_callback(attrs: &[Attribute]) -> Option<NestedMeta> {
    let attr = attrs.iter().find(|attr| attr.path.is_ident("btif_callback"))?;

    match attr.parse_meta() {
        Ok(Meta::List(meta_list)) => meta_list.nested.first().cloned(),
        _ => None,
    }
}

/// Generates a dispatcher from an event enum to the functions of a trait.
///
/// Example usage: This will generate a function called `dispatch_base_callbacks` to dispatch
/// `bt_topshim::btif::BaseCallbacks` to the functions in the defined trait.
///
/// ```ignore
/// #[btif_callbacks_dispatcher(dispatch_base_callbacks, BaseCallbacks)]
/// trait BtifBluetoothCallbacks {
///     #[btif_callback(Foo)]
///     fn foo(&mut self, param1: u32, param2: bool);
///     #[btif_callback(Bar)]
///     fn bar(&mut self);
/// }
/// ```
///
/// The generated function can be called against any struct that implements the defined trait:
/// ```ignore
/// dispatch_base_callbacks(&mut obj, BaseCallbacks::Foo(1, true));
/// ```
///
/// Variants without an associated function are logged at debug level and dropped.
#[proc_macro_attribute]
pub fn btif_callbacks_dispatcher(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = Punctuated::<Expr, Comma>::parse_separated_nonempty
        .parse(attr)
        .expect("expected: dispatcher function name, callbacks enum");

    let fn_ident = match args.iter().next() {
        Some(Expr::Path(p)) => p.path.get_ident().expect("function name must be an ident").clone(),
        _ => panic!("function name must be specified"),
    };

    let callbacks_enum_ident = match args.iter().nth(1) {
        Some(Expr::Path(p)) => p.path.get_ident().expect("callbacks enum must be an ident").clone(),
        _ => panic!("callbacks enum ident must be specified"),
    };

    let ast: ItemTrait = syn::parse(item.clone()).expect("btif_callbacks_dispatcher needs a trait");
    let trait_ident = ast.ident;

    let mut dispatch_arms = quote! {};
    for trait_item in ast.items {
        let m = match trait_item {
            TraitItem::Method(m) => m,
            _ => continue,
        };

        let btif_callback = match find_btif_callback(&m.attrs) {
            Some(variant) => variant,
            None => continue,
        };

        let mut arg_names = quote! {};
        for input in m.sig.inputs {
            if let FnArg::Typed(t) = input {
                if let Pat::Ident(i) = *t.pat {
                    let attr_name = i.ident;
                    arg_names = quote! { #arg_names #attr_name, };
                }
            }
        }
        let method_ident = m.sig.ident;

        dispatch_arms = quote! {
            #dispatch_arms
            #callbacks_enum_ident::#btif_callback(#arg_names) => {
                obj.#method_ident(#arg_names);
            }
        };
    }

    let ori_item = proc_macro2::TokenStream::from(item);

    let gen = quote! {
        #ori_item

        #[allow(unreachable_patterns)]
        pub(crate) fn #fn_ident<T: #trait_ident>(obj: &mut T, cb: #callbacks_enum_ident) {
            match cb {
                #dispatch_arms

                _ => log::debug!("Unhandled callback arm {:?}", cb),
            }
        }
    };

    gen.into()
}
