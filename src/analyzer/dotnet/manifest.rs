use std::path::Path;

use serde::Deserialize;

use crate::error::{read_to_string, Error, Result};

/// An MSBuild project file (`.csproj`, `.fsproj`, `.vbproj`).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Manifest {
    #[serde(default)]
    property_group: Vec<PropertyGroup>,
    #[serde(default)]
    item_group: Vec<ItemGroup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PropertyGroup {
    #[serde(default)]
    root_namespace: String,
    #[serde(default)]
    assembly_name: String,
    #[serde(default)]
    version: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemGroup {
    #[serde(default)]
    package_reference: Vec<Reference>,
    #[serde(default)]
    project_reference: Vec<Reference>,
}

/// A package or project reference. `version` is empty when none is pinned.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Reference {
    #[serde(rename = "@Include", default)]
    pub include: String,
    #[serde(rename = "@Version", alias = "Version", default)]
    pub version: String,
}

impl Manifest {
    pub fn read(path: &Path) -> Result<Self> {
        let content = read_to_string(path)?;
        Self::parse(&content).map_err(|details| Error::ManifestParse {
            path: path.to_path_buf(),
            details,
        })
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        quick_xml::de::from_str(content).map_err(|e| e.to_string())
    }

    pub fn name(&self) -> &str {
        self.first_property(|g| &g.root_namespace)
            .or_else(|| self.first_property(|g| &g.assembly_name))
            .unwrap_or("")
    }

    pub fn version(&self) -> &str {
        self.first_property(|g| &g.version).unwrap_or("")
    }

    /// Project and package references across every item group.
    pub fn imports(&self) -> Vec<&Reference> {
        self.item_group
            .iter()
            .flat_map(|g| g.project_reference.iter().chain(g.package_reference.iter()))
            .collect()
    }

    pub fn packages(&self) -> Vec<&Reference> {
        self.item_group
            .iter()
            .flat_map(|g| g.package_reference.iter())
            .collect()
    }

    pub fn projects(&self) -> Vec<&Reference> {
        self.item_group
            .iter()
            .flat_map(|g| g.project_reference.iter())
            .collect()
    }

    fn first_property<F>(&self, field: F) -> Option<&str>
    where
        F: Fn(&PropertyGroup) -> &String,
    {
        self.property_group
            .iter()
            .map(|g| field(g).trim())
            .find(|value| !value.is_empty())
    }
}

/// Legacy `packages.config` listing.
#[derive(Debug, Default, Deserialize)]
struct PackagesConfig {
    #[serde(rename = "package", default)]
    packages: Vec<PackagesConfigEntry>,
}

#[derive(Debug, Deserialize)]
struct PackagesConfigEntry {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@version", default)]
    version: String,
}

/// Read `<package id="..." version="..." />` entries as package references.
pub fn read_packages_config(path: &Path) -> Result<Vec<Reference>> {
    let content = read_to_string(path)?;
    let config: PackagesConfig =
        quick_xml::de::from_str(&content).map_err(|e| Error::ManifestParse {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
    Ok(config
        .packages
        .into_iter()
        .map(|p| Reference {
            include: p.id,
            version: p.version,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <TargetFramework>net6.0</TargetFramework>
    <AssemblyName>Acme.App</AssemblyName>
  </PropertyGroup>
  <ItemGroup>
    <ProjectReference Include="..\Acme.Core\Acme.Core.csproj" />
    <PackageReference Include="Newtonsoft.Json" Version="13.0.1" />
  </ItemGroup>
  <PropertyGroup Condition="'$(Configuration)' == 'Release'">
    <RootNamespace>Acme.App.Root</RootNamespace>
    <Version>2.3.0</Version>
  </PropertyGroup>
  <ItemGroup>
    <PackageReference Include="Serilog">
      <Version>2.12.0</Version>
    </PackageReference>
    <PackageReference Include="Polly" />
    <Reference Include="System.Xml" />
  </ItemGroup>
</Project>"#;

    #[test]
    fn test_parse_csproj() {
        let manifest = Manifest::parse(CSPROJ).unwrap();
        assert_eq!(manifest.name(), "Acme.App.Root");
        assert_eq!(manifest.version(), "2.3.0");

        let packages = manifest.packages();
        assert_eq!(packages.len(), 3);
        assert_eq!(packages[0].include, "Newtonsoft.Json");
        assert_eq!(packages[0].version, "13.0.1");
        assert_eq!(packages[1].include, "Serilog");
        assert_eq!(packages[1].version, "2.12.0");
        assert_eq!(packages[2].include, "Polly");
        assert_eq!(packages[2].version, "");

        let projects = manifest.projects();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].include, "..\\Acme.Core\\Acme.Core.csproj");

        assert_eq!(manifest.imports().len(), 4);
    }

    #[test]
    fn test_name_and_version_fall_back_to_empty() {
        let manifest = Manifest::parse(r#"<Project Sdk="Microsoft.NET.Sdk" />"#).unwrap();
        assert_eq!(manifest.name(), "");
        assert_eq!(manifest.version(), "");
        assert!(manifest.imports().is_empty());
    }

    #[test]
    fn test_assembly_name_used_without_root_namespace() {
        let manifest = Manifest::parse(
            r#"<Project><PropertyGroup><AssemblyName>Tool</AssemblyName></PropertyGroup></Project>"#,
        )
        .unwrap();
        assert_eq!(manifest.name(), "Tool");
    }

    #[test]
    fn test_read_reports_path_on_bad_xml() {
        let mut f = NamedTempFile::with_suffix(".csproj").unwrap();
        write!(f, "<Project><ItemGroup></Project>").unwrap();
        let err = Manifest::read(f.path()).unwrap_err();
        assert!(matches!(err, Error::ManifestParse { ref path, .. } if path == f.path()));
    }

    #[test]
    fn test_read_packages_config() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<packages>
  <package id="Newtonsoft.Json" version="13.0.1" targetFramework="net452" />
  <package id="NUnit" version="3.13.3" targetFramework="net452" />
</packages>"#;
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{}", xml).unwrap();
        let refs = read_packages_config(f.path()).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].include, "Newtonsoft.Json");
        assert_eq!(refs[1].version, "3.13.3");
    }
}
