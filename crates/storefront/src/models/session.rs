//! Session key constants.
//!
//! All per-visitor state lives in the session store under these keys.
//! The cart is deliberately ephemeral: losing the session loses the cart.

/// Session keys for storefront state.
pub mod keys {
    /// Key for the visitor's cart ledger.
    pub const CART: &str = "cart";

    /// Key for the synced user profile.
    pub const PROFILE: &str = "profile";

    /// Key for the identity-provider session id (needed for revocation).
    pub const IDENTITY_SESSION: &str = "identity_session";

    /// Key for the selected display-currency code.
    pub const CURRENCY: &str = "currency";
}
