use std::fmt;

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Auth,
    Products,
    Product(Uuid),
    Stores,
    Store(Uuid),
    MyStore,
    CreateStore,
    CreateProduct,
    Chat,
    Notifications,
    Profile,
    Faq,
    Terms,
    About,
    /// Anything else; keeps the path that was asked for.
    NotFound(String),
}

impl Route {
    /// Match a path. Query strings, fragments and trailing slashes are ignored.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Self::Home,
            ["auth"] => Self::Auth,
            ["products"] => Self::Products,
            ["products", id] => id.parse().map(Self::Product).unwrap_or_else(|_| Self::NotFound(path.to_string())),
            ["stores"] => Self::Stores,
            ["stores", id] => id.parse().map(Self::Store).unwrap_or_else(|_| Self::NotFound(path.to_string())),
            ["my-store"] => Self::MyStore,
            ["create-store"] => Self::CreateStore,
            ["create-product"] => Self::CreateProduct,
            ["chat"] => Self::Chat,
            ["notifications"] => Self::Notifications,
            ["profile"] => Self::Profile,
            ["faq"] => Self::Faq,
            ["terms"] => Self::Terms,
            ["about"] => Self::About,
            _ => Self::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".into(),
            Self::Auth => "/auth".into(),
            Self::Products => "/products".into(),
            Self::Product(id) => format!("/products/{}", id),
            Self::Stores => "/stores".into(),
            Self::Store(id) => format!("/stores/{}", id),
            Self::MyStore => "/my-store".into(),
            Self::CreateStore => "/create-store".into(),
            Self::CreateProduct => "/create-product".into(),
            Self::Chat => "/chat".into(),
            Self::Notifications => "/notifications".into(),
            Self::Profile => "/profile".into(),
            Self::Faq => "/faq".into(),
            Self::Terms => "/terms".into(),
            Self::About => "/about".into(),
            Self::NotFound(path) => path.clone(),
        }
    }

    /// Pages that only make sense for a signed-in user.
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Self::MyStore
                | Self::CreateStore
                | Self::CreateProduct
                | Self::Chat
                | Self::Notifications
                | Self::Profile
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_format_agree() {
        let id = Uuid::new_v4();
        for route in [
            Route::Home,
            Route::Auth,
            Route::Product(id),
            Route::Store(id),
            Route::CreateProduct,
            Route::Faq,
        ] {
            assert_eq!(Route::parse(&route.path()), route);
        }
    }

    #[test]
    fn odd_paths() {
        assert_eq!(Route::parse("/products/?page=2"), Route::Products);
        assert_eq!(Route::parse("/products/not-a-uuid"), Route::NotFound("/products/not-a-uuid".into()));
        assert_eq!(Route::parse("/admin"), Route::NotFound("/admin".into()));
    }

    #[test]
    fn protected_pages() {
        assert!(Route::Chat.requires_auth());
        assert!(Route::CreateProduct.requires_auth());
        assert!(!Route::Products.requires_auth());
        assert!(!Route::Store(Uuid::nil()).requires_auth());
    }
}
