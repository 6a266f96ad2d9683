use crate::parameter::{ChildList, Parameterized, Spawn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpAxis {
    X,
    #[default]
    Y,
    Z,
}

#[derive(Debug, Clone, Default, PartialEq, Parameterized)]
pub struct AssetContributor {
    #[parameter]
    pub author: String,
    #[parameter]
    pub authoring_tool: String,
    #[parameter]
    pub comments: String,
    #[parameter]
    pub source_data: String,
}

impl Spawn for AssetContributor {
    fn spawn(&self) -> Self {
        AssetContributor::default()
    }
}

/// Authoring metadata.
#[derive(Debug, Parameterized)]
pub struct Asset {
    #[parameter(list)]
    contributors: ChildList<AssetContributor>,
    #[parameter]
    pub title: String,
    #[parameter]
    pub subject: String,
    #[parameter]
    pub keywords: String,
    #[parameter]
    pub unit_name: String,
    #[parameter]
    pub unit_in_meters: f32,
    #[parameter]
    pub up_axis: UpAxis,
}

impl Asset {
    pub fn contributors(&self) -> &[AssetContributor] {
        &self.contributors
    }

    pub fn add_contributor(&mut self) -> &mut AssetContributor {
        self.contributors.push(AssetContributor::default())
    }

    pub fn release_contributor(&mut self, index: usize) -> Option<AssetContributor> {
        self.contributors.remove(index)
    }
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            contributors: ChildList::new(),
            title: String::new(),
            subject: String::new(),
            keywords: String::new(),
            unit_name: "meter".to_string(),
            unit_in_meters: 1.0,
            up_axis: UpAxis::Y,
        }
    }
}

impl Clone for Asset {
    fn clone(&self) -> Self {
        self.clone_new()
    }
}

impl Spawn for Asset {
    fn spawn(&self) -> Self {
        Asset::default()
    }
}
